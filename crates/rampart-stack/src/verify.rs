// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Integrity checks over a control block and its buffer.

use bitflags::bitflags;
use rampart_util::murmur_hash64a;

use crate::config::Protection;
use crate::consts::{CANARY, CAP_MAX, HASH_SEED, INIT_CAP};
use crate::item::StackItem;
use crate::poison::is_poison;
use crate::raw_buf::RawBuf;

bitflags! {
    /// Independent fault flags raised by verification.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VerifyFlags: u32 {
        /// Capacity out of range, or disagreeing with the allocation.
        const CAPACITY = 1 << 0;
        /// Size larger than capacity, or non-zero on an empty stack.
        const SIZE = 1 << 1;
        /// Buffer missing on an active stack, or present on an empty one.
        const ITEMS = 1 << 2;
        /// Left control-block sentinel overwritten.
        const STACK_LEFT_CANARY = 1 << 3;
        /// Right control-block sentinel overwritten.
        const STACK_RIGHT_CANARY = 1 << 4;
        /// Guard word before the buffer overwritten or stale.
        const DATA_LEFT_CANARY = 1 << 5;
        /// Guard word after the buffer overwritten or stale.
        const DATA_RIGHT_CANARY = 1 << 6;
        /// Stored checksum differs from a fresh computation.
        const CHECKSUM = 1 << 7;
        /// An unused slot no longer holds the poison value.
        const POISON = 1 << 8;
    }
}

/// Scalar fields of a stack, hashed as one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ControlBlock {
    pub(crate) left_canary: usize,
    pub(crate) size: usize,
    pub(crate) capacity: usize,
    pub(crate) checksum: u64,
    pub(crate) right_canary: usize,
}

impl ControlBlock {
    const HASHED_LEN: usize = 6 * 8;

    /// Fixed little-endian image of the block, checksum field as zero.
    fn hash_image(&self, items_addr: usize) -> [u8; Self::HASHED_LEN] {
        let words = [
            self.left_canary as u64,
            items_addr as u64,
            self.size as u64,
            self.capacity as u64,
            0,
            self.right_canary as u64,
        ];

        let mut image = [0u8; Self::HASHED_LEN];
        for (chunk, word) in image.chunks_exact_mut(8).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }

        image
    }
}

/// Structural checksum: control block hash XOR buffer region hash.
pub(crate) fn checksum<T: StackItem>(ctrl: &ControlBlock, buf: &RawBuf<T>) -> u64 {
    let ctrl_hash = murmur_hash64a(&ctrl.hash_image(buf.items_addr()), HASH_SEED);
    let data_hash = murmur_hash64a(buf.region_bytes(), HASH_SEED);

    ctrl_hash ^ data_hash
}

/// Verifies an active stack. Returns the empty set when every enabled check
/// passes.
pub(crate) fn verify<T: StackItem>(
    ctrl: &ControlBlock,
    buf: Option<&RawBuf<T>>,
    protection: Protection,
) -> VerifyFlags {
    let mut flags = VerifyFlags::empty();

    if ctrl.capacity > CAP_MAX || ctrl.capacity < INIT_CAP {
        flags |= VerifyFlags::CAPACITY;
    }

    if ctrl.size > ctrl.capacity {
        flags |= VerifyFlags::SIZE;
    }

    match buf {
        Some(buf) if buf.capacity() != ctrl.capacity => flags |= VerifyFlags::CAPACITY,
        Some(_) => {}
        None => flags |= VerifyFlags::ITEMS,
    }

    if protection.canary {
        flags |= verify_canaries(ctrl, buf);
    }

    if let Some(buf) = buf {
        if protection.hash && ctrl.checksum != checksum(ctrl, buf) {
            flags |= VerifyFlags::CHECKSUM;
        }

        if protection.poison && !is_tail_poisoned(ctrl.size, buf) {
            flags |= VerifyFlags::POISON;
        }
    }

    flags
}

fn verify_canaries<T: StackItem>(ctrl: &ControlBlock, buf: Option<&RawBuf<T>>) -> VerifyFlags {
    let mut flags = VerifyFlags::empty();

    if ctrl.left_canary != CANARY {
        flags |= VerifyFlags::STACK_LEFT_CANARY;
    }

    if ctrl.right_canary != CANARY {
        flags |= VerifyFlags::STACK_RIGHT_CANARY;
    }

    if let Some(buf) = buf {
        // Re-derived from the current address: a relocated buffer fails too.
        let expected = Some(buf.expected_guard());

        if buf.left_guard() != expected {
            flags |= VerifyFlags::DATA_LEFT_CANARY;
        }

        if buf.right_guard() != expected {
            flags |= VerifyFlags::DATA_RIGHT_CANARY;
        }
    }

    flags
}

fn is_tail_poisoned<T: StackItem>(size: usize, buf: &RawBuf<T>) -> bool {
    let slots = buf.slots();
    let start = size.min(slots.len());

    slots[start..].iter().all(is_poison)
}

/// Verifies that a stack claiming to be unconstructed has every field zeroed
/// and owns no buffer.
pub(crate) fn verify_empty(
    ctrl: &ControlBlock,
    has_buffer: bool,
    protection: Protection,
) -> VerifyFlags {
    let mut flags = VerifyFlags::empty();

    if has_buffer {
        flags |= VerifyFlags::ITEMS;
    }

    if ctrl.capacity != 0 {
        flags |= VerifyFlags::CAPACITY;
    }

    if ctrl.size != 0 {
        flags |= VerifyFlags::SIZE;
    }

    if protection.hash && ctrl.checksum != 0 {
        flags |= VerifyFlags::CHECKSUM;
    }

    if protection.canary {
        if ctrl.left_canary != 0 {
            flags |= VerifyFlags::STACK_LEFT_CANARY;
        }

        if ctrl.right_canary != 0 {
            flags |= VerifyFlags::STACK_RIGHT_CANARY;
        }
    }

    flags
}
