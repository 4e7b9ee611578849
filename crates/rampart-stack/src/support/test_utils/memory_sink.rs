// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::dump::DumpSink;

/// Sink that keeps every report in memory.
///
/// Clones share the same storage, so a test can hand one clone to the stack
/// and inspect the reports through another.
///
/// # Example
///
/// ```rust
/// // test-utils feature required in dev-dependencies
/// use rampart_stack::{GuardedStack, MemorySink, Protection};
///
/// let sink = MemorySink::default();
/// let mut stack = GuardedStack::<u16, _>::with_sink(Protection::full(), sink.clone());
///
/// assert!(stack.pop().is_err());
/// assert_eq!(sink.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    reports: Rc<RefCell<Vec<String>>>,
}

impl MemorySink {
    /// Number of reports received so far.
    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    /// Returns `true` if no report was received.
    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }

    /// Most recent report, if any.
    pub fn last(&self) -> Option<String> {
        self.reports.borrow().last().cloned()
    }

    /// Removes and returns every report received so far.
    pub fn take(&self) -> Vec<String> {
        core::mem::take(&mut *self.reports.borrow_mut())
    }
}

impl DumpSink for MemorySink {
    fn emit(&self, report: &str) {
        self.reports.borrow_mut().push(report.to_string());
    }
}
