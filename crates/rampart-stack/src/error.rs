// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Error types for rampart-stack.

use thiserror::Error;

use crate::verify::VerifyFlags;

/// Errors returned by [`GuardedStack`](crate::GuardedStack) operations.
///
/// Every error is also reported through the stack's dump sink before it is
/// returned.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum StackError {
    /// `construct()` called on a stack that is not in the zeroed state.
    #[error("cannot construct a non-empty stack ({0:?})")]
    NotEmpty(VerifyFlags),

    /// Memory allocation failed, or the requested capacity is out of range.
    ///
    /// The stack keeps its previous buffer, size and capacity.
    #[error("stack memory allocation failed")]
    Alloc,

    /// `pop()` called on a stack with no elements.
    #[error("pop from an empty stack")]
    EmptyPop,

    /// Verification before or after the operation failed.
    ///
    /// When detected after a mutation, the mutation is not undone.
    #[error("stack is corrupted ({0:?})")]
    Corrupted(VerifyFlags),
}

impl StackError {
    /// Fault flags carried by the error, empty for `Alloc` and `EmptyPop`.
    pub fn flags(&self) -> VerifyFlags {
        match self {
            Self::NotEmpty(flags) | Self::Corrupted(flags) => *flags,
            Self::Alloc | Self::EmptyPop => VerifyFlags::empty(),
        }
    }
}
