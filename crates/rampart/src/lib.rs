// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Rampart: self-verifying containers that catch memory corruption early.
//!
//! # Quick Start
//!
//! ```rust
//! use rampart::{GuardedStack, Protection, StackError, VerifyFlags};
//!
//! fn main() -> Result<(), StackError> {
//!     let mut stack = GuardedStack::<u64>::with_protection(Protection::full());
//!     stack.construct()?;
//!
//!     stack.push(0xC0FFEE)?;
//!     assert_eq!(stack.peek()?, Some(0xC0FFEE));
//!     assert_eq!(stack.verify(), VerifyFlags::empty());
//!
//!     // Unused slots hold the poison value, never stale data.
//!     assert_eq!(stack.pop()?, 0xC0FFEE);
//!     assert_eq!(stack.pop_or_poison(), rampart::poison::<u64>());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Crates
//!
//! - [`stack`]: `GuardedStack`, protection selection, verification and dumps.
//! - [`util`]: pattern fills and the MurmurHash64A checksum primitive.
//!
//! # Features
//!
//! | Feature      | Effect                                                  |
//! |--------------|---------------------------------------------------------|
//! | `canary`     | Sentinels and guard words (default)                     |
//! | `hash`       | Structural checksum (default)                           |
//! | `poison`     | Poison check of unused slots (default)                  |
//! | `unprotect`  | Every layer off, no verification                        |
//! | `test-utils` | Failure injection, tamper hooks and `MemorySink`        |

#![cfg_attr(not(test), no_std)]

pub use rampart_stack as stack;
pub use rampart_util as util;

pub use rampart_stack::{
    DumpSink, GuardedStack, Protection, StackError, StackItem, TracingSink, VerifyFlags, is_poison,
    poison,
};
