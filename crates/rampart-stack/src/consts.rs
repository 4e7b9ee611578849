// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

/// Byte repeated across an element's width to form the poison value.
pub const FILL_BYTE: u8 = b'u';

/// Capacity of a freshly constructed stack, and the shrink floor.
pub const INIT_CAP: usize = 8;

/// Multiplicative step used for growth and shrink.
pub const CAP_FACTOR: usize = 2;

/// Largest power of two with the top bit of `usize` clear.
pub const CAP_MAX: usize = 1 << (usize::BITS - 2);

/// Sentinel stored in the control block and mixed into the guard words.
pub const CANARY: usize = 0xBADC_0FFE_E0DD_F00D_u64 as usize;

/// Seed for both halves of the structural checksum.
pub const HASH_SEED: u64 = 0x5EED_DEAD_BEEF_5EED;
