// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Self-verifying dynamic-array stack.
//!
//! `GuardedStack<T>` is a growable LIFO container instrumented to catch memory
//! corruption early: buffer overruns, stray writes, reads of freed slots and
//! tampering with its own control block. It trades speed for diagnostics.
//!
//! # Protection Layers
//!
//! Each layer is selected independently through [`Protection`]:
//!
//! - **Canaries**: two sentinels in the control block, plus two guard words
//!   flanking the heap buffer holding `CANARY ^ buffer_address`. A guard word
//!   that no longer matches reveals an overrun or an unexpected relocation.
//! - **Checksum**: MurmurHash64A over the control block (checksum field as
//!   zero) XOR MurmurHash64A over the whole buffer region. Recomputed on every
//!   mutation.
//! - **Poison**: unused slots hold the fill byte `b'u'` repeated across the
//!   element width. Verification flags any unused slot that lost it.
//!
//! Every operation verifies before and after mutating. Failures are returned
//! as [`StackError`] and a full diagnostic dump is emitted to the stack's
//! [`DumpSink`] (by default, a `tracing` error event).
//!
//! # Example
//!
//! ```rust
//! use rampart_stack::{GuardedStack, Protection, StackError};
//!
//! fn example() -> Result<(), StackError> {
//!     let mut stack = GuardedStack::<u32>::with_protection(Protection::full());
//!     stack.construct()?;
//!
//!     for i in 0..9 {
//!         stack.push(i)?;
//!     }
//!     assert_eq!(stack.capacity(), 16);
//!
//!     assert_eq!(stack.pop()?, 8);
//!     assert!(stack.verify().is_empty());
//!
//!     stack.destruct();
//!     assert!(!stack.is_constructed());
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
//!
//! # Features
//!
//! - `canary`, `hash`, `poison` (default): layers enabled by
//!   [`Protection::from_features`].
//! - `unprotect`: forces every layer off and skips verification.
//! - `test-utils`: failure injection ([`StackBehaviour`]), tamper hooks and
//!   [`MemorySink`].

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

extern crate alloc;

mod config;
mod consts;
mod dump;
mod error;
mod item;
mod poison;
mod raw_buf;
mod stack;
mod verify;

#[cfg(any(test, feature = "test-utils"))]
mod support;

#[cfg(test)]
mod tests;

pub use config::Protection;
pub use consts::{CANARY, CAP_FACTOR, CAP_MAX, FILL_BYTE, HASH_SEED, INIT_CAP};
pub use dump::{DumpSink, TracingSink};
pub use error::StackError;
pub use item::StackItem;
pub use poison::{is_poison, poison};
pub use stack::GuardedStack;
pub use verify::VerifyFlags;

#[cfg(any(test, feature = "test-utils"))]
pub use stack::StackBehaviour;
#[cfg(any(test, feature = "test-utils"))]
pub use support::test_utils::MemorySink;
