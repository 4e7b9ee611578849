// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Diagnostic dump rendering and sinks.
//!
//! Rendering never fails and never reads outside the real allocation, so it
//! is safe to call on a stack whose control block has been tampered with.

use alloc::string::String;
use core::fmt::Write;
use core::mem::size_of;

use crate::config::Protection;
use crate::item::StackItem;
use crate::poison::is_poison;
use crate::raw_buf::RawBuf;
use crate::verify::{ControlBlock, VerifyFlags, checksum, verify, verify_empty};

const RULE: &str = "----------------------------------------------";

/// Destination for rendered diagnostic dumps.
///
/// Buffering and flushing are the sink's responsibility.
pub trait DumpSink {
    /// Receives one complete, pre-formatted report.
    fn emit(&self, report: &str);
}

/// Default sink: one `tracing` error event per report.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DumpSink for TracingSink {
    fn emit(&self, report: &str) {
        tracing::error!(target: "rampart_stack::dump", "stack dump\n{report}");
    }
}

#[inline]
fn indicate(failed: bool) -> &'static str {
    if failed { "error" } else { "ok" }
}

/// Renders the full state of a stack.
pub(crate) fn render<T: StackItem>(
    ctrl: &ControlBlock,
    buf: Option<&RawBuf<T>>,
    protection: Protection,
) -> String {
    let mut out = String::new();

    // fmt::Write for String is infallible.
    let _ = match buf {
        None => render_empty(&mut out, ctrl, protection),
        Some(buf) => render_active(&mut out, ctrl, buf, protection),
    };

    out
}

fn render_empty(
    out: &mut String,
    ctrl: &ControlBlock,
    protection: Protection,
) -> core::fmt::Result {
    let vrf = verify_empty(ctrl, false, protection);

    writeln!(out, "{RULE}")?;
    writeln!(out, " Empty stack: {}", indicate(!vrf.is_empty()))?;
    writeln!(
        out,
        " Size:     {:>15} {}",
        ctrl.size,
        indicate(vrf.contains(VerifyFlags::SIZE))
    )?;
    writeln!(
        out,
        " Capacity: {:>15} {}",
        ctrl.capacity,
        indicate(vrf.contains(VerifyFlags::CAPACITY))
    )?;
    writeln!(out, " Address start: null")?;

    if protection.hash {
        writeln!(
            out,
            " Saved hash (hex): {:16x} {}",
            ctrl.checksum,
            indicate(vrf.contains(VerifyFlags::CHECKSUM))
        )?;
    }

    if protection.canary {
        render_stack_canaries(out, ctrl, vrf)?;
    }

    writeln!(out, "{RULE}")
}

fn render_active<T: StackItem>(
    out: &mut String,
    ctrl: &ControlBlock,
    buf: &RawBuf<T>,
    protection: Protection,
) -> core::fmt::Result {
    let vrf = verify(ctrl, Some(buf), protection);
    let start = buf.items_addr();
    // Control-block capacity, as the stack believes it to be.
    let end = start.wrapping_add(size_of::<T>().wrapping_mul(ctrl.capacity));

    writeln!(out, "{RULE}")?;
    writeln!(out, " Stack: {}", indicate(!vrf.is_empty()))?;
    writeln!(
        out,
        " Size:     {:>15} {}",
        ctrl.size,
        indicate(vrf.contains(VerifyFlags::SIZE))
    )?;
    writeln!(
        out,
        " Capacity: {:>15} {}",
        ctrl.capacity,
        indicate(vrf.contains(VerifyFlags::CAPACITY))
    )?;
    if buf.capacity() != ctrl.capacity {
        writeln!(out, " Allocated:{:>15}", buf.capacity())?;
    }
    writeln!(out, " Address start: {start:#x}")?;
    writeln!(out, " Address   end: {end:#x}")?;
    writeln!(out, "{RULE}")?;

    if protection.hash {
        writeln!(
            out,
            " Hash       (hex): {:16x} {}",
            checksum(ctrl, buf),
            indicate(vrf.contains(VerifyFlags::CHECKSUM))
        )?;
        writeln!(out, " Saved hash (hex): {:16x}", ctrl.checksum)?;
        writeln!(out, "{RULE}")?;
    }

    if protection.canary {
        render_stack_canaries(out, ctrl, vrf)?;
        writeln!(out, "{RULE}")?;
        render_guards(out, buf, vrf)?;
        writeln!(out, "{RULE}")?;
    }

    if protection.poison {
        writeln!(
            out,
            " Unused slots poisoned: {}",
            indicate(vrf.contains(VerifyFlags::POISON))
        )?;
        writeln!(out, "{RULE}")?;
    }

    for (i, item) in buf.slots().iter().enumerate() {
        let offset = size_of::<T>() * i;
        if is_poison(item) {
            writeln!(out, "| {offset:#06X} stack[{i:>7}] = {:>18} |", "poison")?;
        } else {
            writeln!(out, "| {offset:#06X} stack[{i:>7}] = {:>18} |", DebugCell(item))?;
        }
    }

    writeln!(out, "{RULE}")
}

fn render_stack_canaries(
    out: &mut String,
    ctrl: &ControlBlock,
    vrf: VerifyFlags,
) -> core::fmt::Result {
    writeln!(
        out,
        " Left  stack canary (hex) = {:x} {}",
        ctrl.left_canary,
        indicate(vrf.contains(VerifyFlags::STACK_LEFT_CANARY))
    )?;
    writeln!(
        out,
        " Right stack canary (hex) = {:x} {}",
        ctrl.right_canary,
        indicate(vrf.contains(VerifyFlags::STACK_RIGHT_CANARY))
    )
}

fn render_guards<T: StackItem>(
    out: &mut String,
    buf: &RawBuf<T>,
    vrf: VerifyFlags,
) -> core::fmt::Result {
    let (Some(left), Some(right)) = (buf.left_guard(), buf.right_guard()) else {
        return writeln!(out, " Data canaries: not allocated");
    };

    writeln!(
        out,
        " Left  data canary (hex) = {left:x} {}\n Address: {:#x}",
        indicate(vrf.contains(VerifyFlags::DATA_LEFT_CANARY)),
        buf.left_guard_addr().unwrap_or_default(),
    )?;
    writeln!(out)?;
    writeln!(
        out,
        " Right data canary (hex) = {right:x} {}\n Address: {:#x}",
        indicate(vrf.contains(VerifyFlags::DATA_RIGHT_CANARY)),
        buf.right_guard_addr().unwrap_or_default(),
    )?;
    writeln!(out, " Expected (hex) = {:x}", buf.expected_guard())
}

/// Pads a `Debug` value like a `Display` one.
struct DebugCell<'a, T>(&'a T);

impl<T: core::fmt::Debug> core::fmt::Display for DebugCell<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut rendered = String::new();
        write!(rendered, "{:?}", self.0)?;
        f.pad(&rendered)
    }
}
