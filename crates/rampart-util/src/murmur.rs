// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! MurmurHash64A (Austin Appleby, public domain algorithm).

const M: u64 = 0xc6a4_a793_5bd1_e995;
const R: u32 = 47;

/// Hashes `data` with MurmurHash64A under `seed`.
///
/// Blocks are read little-endian so the result does not depend on the host.
/// Not a cryptographic hash: it detects accidental corruption, not forgery.
///
/// # Example
///
/// ```
/// use rampart_util::murmur_hash64a;
///
/// let a = murmur_hash64a(b"stack", 7);
/// assert_eq!(a, murmur_hash64a(b"stack", 7));
/// assert_ne!(a, murmur_hash64a(b"stack", 8));
/// assert_ne!(a, murmur_hash64a(b"stakc", 7));
/// ```
pub fn murmur_hash64a(data: &[u8], seed: u64) -> u64 {
    let mut h = seed ^ (data.len() as u64).wrapping_mul(M);

    let mut blocks = data.chunks_exact(8);
    for block in blocks.by_ref() {
        let mut k = block
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &b)| acc | (b as u64) << (8 * i));

        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        for (i, &b) in tail.iter().enumerate() {
            h ^= (b as u64) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;

    h
}
