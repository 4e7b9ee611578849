// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Test utilities for rampart-stack.

use crate::config::Protection;
use crate::stack::GuardedStack;
use crate::support::test_utils::MemorySink;

/// Zeroed `u32` stack reporting to a fresh [`MemorySink`].
pub(crate) fn stack_with_sink(
    protection: Protection,
) -> (GuardedStack<u32, MemorySink>, MemorySink) {
    let sink = MemorySink::default();
    let stack = GuardedStack::with_sink(protection, sink.clone());

    (stack, sink)
}

/// Constructed stack holding `0..count`.
pub(crate) fn filled_stack(
    protection: Protection,
    count: u32,
) -> (GuardedStack<u32, MemorySink>, MemorySink) {
    let (mut stack, sink) = stack_with_sink(protection);
    stack.construct().expect("Failed to construct()");

    for i in 0..count {
        stack.push(i).expect("Failed to push()");
    }

    (stack, sink)
}
