// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Poison value and poison fills.

use core::mem::{MaybeUninit, size_of};

use rampart_util::{fill_bytes_with_pattern, is_filled_with_pattern};

use crate::consts::FILL_BYTE;
use crate::item::StackItem;

/// Returns the poison value of `T`: [`FILL_BYTE`] repeated across its width.
///
/// # Example
///
/// ```rust
/// use rampart_stack::poison;
///
/// assert_eq!(poison::<u32>(), 0x7575_7575);
/// ```
#[inline]
pub fn poison<T: StackItem>() -> T {
    let mut slot = MaybeUninit::<T>::uninit();

    // SAFETY: StackItem guarantees every bit pattern of T is a valid value,
    // and write_bytes initializes all size_of::<T>() bytes.
    unsafe {
        core::ptr::write_bytes(slot.as_mut_ptr(), FILL_BYTE, 1);
        slot.assume_init()
    }
}

/// Returns `true` if `item` holds the poison pattern.
///
/// Compares bytes, not values, so it is exact for floats too.
#[inline]
pub fn is_poison<T: StackItem>(item: &T) -> bool {
    is_filled_with_pattern(item_bytes(item), FILL_BYTE)
}

/// Writes the poison value into every slot of `slots`.
#[inline]
pub(crate) fn poison_slots<T: StackItem>(slots: &mut [T]) {
    let len = core::mem::size_of_val(slots);
    // SAFETY: the slots are initialized and padding-free, and every byte
    // pattern written back is a valid T (StackItem).
    let bytes = unsafe { core::slice::from_raw_parts_mut(slots.as_mut_ptr() as *mut u8, len) };

    fill_bytes_with_pattern(bytes, FILL_BYTE);
}

#[inline(always)]
pub(crate) fn item_bytes<T: StackItem>(item: &T) -> &[u8] {
    // SAFETY: StackItem guarantees T has no padding, so all size_of::<T>()
    // bytes behind the reference are initialized.
    unsafe { core::slice::from_raw_parts(item as *const T as *const u8, size_of::<T>()) }
}
