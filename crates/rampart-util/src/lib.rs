// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Byte-level helpers shared by the rampart crates.
//!
//! - Pattern fills and pattern probes, used to poison unused memory and to
//!   check that it is still poisoned.
//! - A seeded MurmurHash64A, used as the structural checksum.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

mod murmur;

pub use murmur::murmur_hash64a;

/// Overwrites every byte of `slice` with `pattern`.
///
/// Used to poison slots that no longer hold live data.
///
/// # Example
///
/// ```
/// use rampart_util::{fill_bytes_with_pattern, is_filled_with_pattern};
///
/// let mut slot = 0xDEAD_BEEF_u32.to_ne_bytes();
/// fill_bytes_with_pattern(&mut slot, b'u');
/// assert!(is_filled_with_pattern(&slot, b'u'));
/// ```
#[inline]
pub fn fill_bytes_with_pattern(slice: &mut [u8], pattern: u8) {
    slice.fill(pattern);
}

/// Returns `true` if every byte of `slice` equals `pattern`.
///
/// An empty slice trivially matches.
///
/// # Example
///
/// ```
/// use rampart_util::is_filled_with_pattern;
///
/// assert!(is_filled_with_pattern(&[0xAA; 4], 0xAA));
/// assert!(!is_filled_with_pattern(&[0xAA, 0xAB], 0xAA));
/// ```
#[inline]
pub fn is_filled_with_pattern(slice: &[u8], pattern: u8) -> bool {
    slice.iter().all(|&b| b == pattern)
}

/// Rounds `value` up to the next multiple of `align`.
///
/// Returns `None` on overflow. `align` must be a power of two.
///
/// # Example
///
/// ```
/// use rampart_util::align_up;
///
/// assert_eq!(align_up(13, 8), Some(16));
/// assert_eq!(align_up(16, 8), Some(16));
/// assert_eq!(align_up(usize::MAX, 8), None);
/// ```
#[inline]
pub fn align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());

    let mask = align - 1;
    value.checked_add(mask).map(|v| v & !mask)
}
