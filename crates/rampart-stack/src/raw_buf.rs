// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! RawBuf - Heap buffer with optional guard words around the slots.
//!
//! Layout with canaries enabled:
//!
//! ```text
//! base
//! | ... | left guard | slot 0 | ... | slot cap-1 | padding | right guard |
//!                    ^ items                               ^ aligned for usize
//! ```
//!
//! Without canaries the allocation holds the slots only. The slot region and
//! the padding are always fully initialized (poison bytes or stored items).

use alloc::alloc::{Layout, alloc, dealloc, realloc};
use core::marker::PhantomData;
use core::mem::{align_of, size_of};
use core::ptr::NonNull;

use rampart_util::align_up;

use crate::consts::{CANARY, FILL_BYTE};
use crate::error::StackError;
use crate::item::StackItem;

const WORD: usize = size_of::<usize>();

/// Byte offsets of one allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    layout: Layout,
    /// Offset of slot 0.
    items_offset: usize,
    /// Slots plus alignment padding.
    region_len: usize,
}

impl Geometry {
    fn new<T: StackItem>(capacity: usize, canary: bool) -> Result<Self, StackError> {
        let items_len = capacity
            .checked_mul(size_of::<T>())
            .ok_or(StackError::Alloc)?;

        let geometry = if canary {
            let align = align_of::<T>().max(align_of::<usize>());
            let items_offset = WORD.max(align_of::<T>());
            let region_end = items_offset
                .checked_add(items_len)
                .and_then(|end| align_up(end, align_of::<usize>()))
                .ok_or(StackError::Alloc)?;
            let total = region_end.checked_add(WORD).ok_or(StackError::Alloc)?;

            Self {
                layout: Layout::from_size_align(total, align).map_err(|_| StackError::Alloc)?,
                items_offset,
                region_len: region_end - items_offset,
            }
        } else {
            Self {
                layout: Layout::from_size_align(items_len, align_of::<T>())
                    .map_err(|_| StackError::Alloc)?,
                items_offset: 0,
                region_len: items_len,
            }
        };

        if geometry.layout.size() == 0 {
            return Err(StackError::Alloc);
        }

        Ok(geometry)
    }
}

/// Exclusively owned, capacity-sized slot buffer.
pub(crate) struct RawBuf<T: StackItem> {
    base: NonNull<u8>,
    geometry: Geometry,
    capacity: usize,
    canary: bool,
    _marker: PhantomData<T>,
}

// SAFETY: RawBuf uniquely owns its allocation, like Vec<T>; the pointer is
// never shared with another owner.
unsafe impl<T: StackItem + Send> Send for RawBuf<T> {}

impl<T: StackItem> RawBuf<T> {
    /// Allocates `capacity` poisoned slots, plus guard words if `canary`.
    pub(crate) fn allocate(capacity: usize, canary: bool) -> Result<Self, StackError> {
        let geometry = Geometry::new::<T>(capacity, canary)?;

        // SAFETY: Geometry::new rejects zero-sized layouts.
        let ptr = unsafe { alloc(geometry.layout) };
        let base = NonNull::new(ptr).ok_or(StackError::Alloc)?;

        let mut buf = Self {
            base,
            geometry,
            capacity,
            canary,
            _marker: PhantomData,
        };

        buf.poison_region_from(0);
        buf.write_guards();

        Ok(buf)
    }

    /// Reallocates to exactly `capacity` slots.
    ///
    /// Slots `[0, keep)` are preserved, everything from `keep` to the end of
    /// the region is poisoned and the guard words are rewritten for the new
    /// address. On failure `self` is left untouched.
    pub(crate) fn resize(&mut self, capacity: usize, keep: usize) -> Result<(), StackError> {
        let geometry = Geometry::new::<T>(capacity, self.canary)?;
        debug_assert_eq!(geometry.layout.align(), self.geometry.layout.align());
        let keep = keep.min(capacity).min(self.capacity);

        // SAFETY: base was allocated with self.geometry.layout, the new size is
        // non-zero and the alignment is unchanged. A null return leaves the old
        // block valid.
        let ptr = unsafe {
            realloc(
                self.base.as_ptr(),
                self.geometry.layout,
                geometry.layout.size(),
            )
        };
        self.base = NonNull::new(ptr).ok_or(StackError::Alloc)?;
        self.geometry = geometry;
        self.capacity = capacity;

        // items_offset only depends on T and canary, so kept slots did not move
        // relative to base.
        self.poison_region_from(keep * size_of::<T>());
        self.write_guards();

        Ok(())
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn items_ptr(&self) -> *const T {
        // SAFETY: items_offset is within the allocation.
        unsafe { self.base.as_ptr().add(self.geometry.items_offset) as *const T }
    }

    #[inline]
    fn items_mut_ptr(&mut self) -> *mut T {
        // SAFETY: items_offset is within the allocation.
        unsafe { self.base.as_ptr().add(self.geometry.items_offset) as *mut T }
    }

    /// Address of slot 0, as mixed into the guard words.
    #[inline]
    pub(crate) fn items_addr(&self) -> usize {
        self.items_ptr() as usize
    }

    /// Value both guard words must hold for the current address.
    #[inline]
    pub(crate) fn expected_guard(&self) -> usize {
        CANARY ^ self.items_addr()
    }

    /// All `capacity` slots, stored and poisoned alike.
    #[inline]
    pub(crate) fn slots(&self) -> &[T] {
        // SAFETY: the region holds capacity initialized T values (StackItem
        // accepts any bit pattern) and is suitably aligned.
        unsafe { core::slice::from_raw_parts(self.items_ptr(), self.capacity) }
    }

    #[inline]
    pub(crate) fn slots_mut(&mut self) -> &mut [T] {
        let capacity = self.capacity;
        // SAFETY: see slots(); &mut self guarantees exclusive access.
        unsafe { core::slice::from_raw_parts_mut(self.items_mut_ptr(), capacity) }
    }

    /// Slots plus trailing padding, as hashed by the checksum.
    #[inline]
    pub(crate) fn region_bytes(&self) -> &[u8] {
        // SAFETY: the region is fully initialized and lies inside the allocation.
        unsafe {
            core::slice::from_raw_parts(self.items_ptr() as *const u8, self.geometry.region_len)
        }
    }

    /// Writes poison bytes over the region from byte offset `from` to its end.
    ///
    /// Runs right after (re)allocation, while that tail may be uninitialized.
    fn poison_region_from(&mut self, from: usize) {
        let len = self.geometry.region_len - from;
        // SAFETY: [from, region_len) lies inside the allocation.
        unsafe {
            core::ptr::write_bytes((self.items_mut_ptr() as *mut u8).add(from), FILL_BYTE, len);
        }
    }

    fn left_guard_ptr(&self) -> Option<*mut usize> {
        if !self.canary {
            return None;
        }

        // SAFETY: items_offset >= WORD when canaries are enabled, and it is a
        // multiple of align_of::<usize>().
        Some(unsafe { self.base.as_ptr().add(self.geometry.items_offset - WORD) as *mut usize })
    }

    fn right_guard_ptr(&self) -> Option<*mut usize> {
        if !self.canary {
            return None;
        }

        // SAFETY: the region end is usize-aligned and followed by one word.
        Some(unsafe {
            self.base
                .as_ptr()
                .add(self.geometry.items_offset + self.geometry.region_len) as *mut usize
        })
    }

    pub(crate) fn left_guard_addr(&self) -> Option<usize> {
        self.left_guard_ptr().map(|p| p as usize)
    }

    pub(crate) fn right_guard_addr(&self) -> Option<usize> {
        self.right_guard_ptr().map(|p| p as usize)
    }

    /// Current left guard word, `None` without canaries.
    pub(crate) fn left_guard(&self) -> Option<usize> {
        // SAFETY: aligned, in bounds, written at allocation time.
        self.left_guard_ptr().map(|p| unsafe { p.read() })
    }

    /// Current right guard word, `None` without canaries.
    pub(crate) fn right_guard(&self) -> Option<usize> {
        // SAFETY: aligned, in bounds, written at allocation time.
        self.right_guard_ptr().map(|p| unsafe { p.read() })
    }

    fn write_guards(&mut self) {
        let guard = self.expected_guard();

        if let (Some(left), Some(right)) = (self.left_guard_ptr(), self.right_guard_ptr()) {
            // SAFETY: both pointers are aligned and in bounds, &mut self is held.
            unsafe {
                left.write(guard);
                right.write(guard);
            }
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl<T: StackItem> RawBuf<T> {
    pub(crate) fn overwrite_guards(&mut self, left: Option<usize>, right: Option<usize>) {
        // SAFETY: aligned, in bounds, &mut self is held.
        unsafe {
            if let (Some(p), Some(v)) = (self.left_guard_ptr(), left) {
                p.write(v);
            }
            if let (Some(p), Some(v)) = (self.right_guard_ptr(), right) {
                p.write(v);
            }
        }
    }

    pub(crate) fn region_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.geometry.region_len;
        // SAFETY: the region is fully initialized, &mut self is held.
        unsafe { core::slice::from_raw_parts_mut(self.items_mut_ptr() as *mut u8, len) }
    }
}

impl<T: StackItem> Drop for RawBuf<T> {
    fn drop(&mut self) {
        // SAFETY: base was allocated with geometry.layout and is released once.
        unsafe { dealloc(self.base.as_ptr(), self.geometry.layout) }
    }
}

impl<T: StackItem> core::fmt::Debug for RawBuf<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawBuf")
            .field("items", &self.items_ptr())
            .field("capacity", &self.capacity)
            .field("canary", &self.canary)
            .finish_non_exhaustive()
    }
}
