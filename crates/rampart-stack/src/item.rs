// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

/// Element types a [`GuardedStack`](crate::GuardedStack) can hold.
///
/// The stack fills unused slots byte-wise with the poison pattern and hashes
/// the buffer as raw bytes, so element types must be plain data.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - every bit pattern is a valid value of the type,
/// - the type has no padding bytes,
/// - the type is not zero-sized.
pub unsafe trait StackItem: Copy + PartialEq + core::fmt::Debug + 'static {}

macro_rules! impl_stack_item {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: primitive numeric types are padding-free, non-zero-sized
            // and valid for any bit pattern.
            unsafe impl StackItem for $ty {}
        )*
    };
}

impl_stack_item!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
);
