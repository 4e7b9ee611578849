// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use alloc::string::String;

use crate::config::Protection;
use crate::consts::{CANARY, CAP_FACTOR, CAP_MAX, INIT_CAP};
use crate::dump::{DumpSink, TracingSink, render};
use crate::error::StackError;
use crate::item::StackItem;
use crate::poison::{poison, poison_slots};
use crate::raw_buf::RawBuf;
use crate::verify::{ControlBlock, VerifyFlags, checksum, verify, verify_empty};

/// Test behaviour for injecting allocation failures in `GuardedStack`.
///
/// Only available with the `test-utils` feature. The behaviour is sticky:
/// once set, it remains active until changed.
///
/// # Example
///
/// ```rust
/// // test-utils feature required in dev-dependencies
/// use rampart_stack::{GuardedStack, Protection, StackBehaviour, StackError};
///
/// let mut stack = GuardedStack::<u8>::with_protection(Protection::full());
/// stack.change_behaviour(StackBehaviour::FailAtConstruct);
///
/// assert_eq!(stack.construct(), Err(StackError::Alloc));
/// assert!(!stack.is_constructed());
/// ```
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackBehaviour {
    /// Normal behaviour - no injected failures.
    #[default]
    None,
    /// The initial allocation in `construct()` fails.
    FailAtConstruct,
    /// Every growth allocation in `push()` fails.
    FailAtGrow,
    /// Every shrink reallocation in `pop()` fails.
    FailAtShrink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resize {
    Construct,
    Grow,
    Shrink,
}

/// Growable LIFO stack that verifies its own integrity around every operation.
///
/// A new stack is in the zeroed state and must be [`construct`]ed before use.
/// [`destruct`] returns it to the zeroed state; dropping it releases the
/// buffer as well.
///
/// # Example
///
/// ```rust
/// use rampart_stack::{GuardedStack, Protection, StackError};
///
/// fn example() -> Result<(), StackError> {
///     let mut stack = GuardedStack::<i64>::with_protection(Protection::full());
///     stack.construct()?;
///
///     stack.push(-1)?;
///     stack.push(2)?;
///
///     assert_eq!(stack.pop()?, 2);
///     assert_eq!(stack.pop()?, -1);
///     assert_eq!(stack.pop(), Err(StackError::EmptyPop));
///     Ok(())
/// }
/// # example().unwrap();
/// ```
///
/// [`construct`]: GuardedStack::construct
/// [`destruct`]: GuardedStack::destruct
pub struct GuardedStack<T: StackItem, S: DumpSink = TracingSink> {
    ctrl: ControlBlock,
    buf: Option<RawBuf<T>>,
    protection: Protection,
    sink: S,
    #[cfg(any(test, feature = "test-utils"))]
    behaviour: StackBehaviour,
}

impl<T: StackItem> GuardedStack<T> {
    /// Creates a zeroed stack with the build-time protection selection.
    pub fn new() -> Self {
        Self::with_protection(Protection::from_features())
    }

    /// Creates a zeroed stack with the given protection layers.
    pub fn with_protection(protection: Protection) -> Self {
        Self::with_sink(protection, TracingSink)
    }
}

impl<T: StackItem> Default for GuardedStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StackItem, S: DumpSink> GuardedStack<T, S> {
    /// Creates a zeroed stack reporting its dumps to `sink`.
    pub fn with_sink(protection: Protection, sink: S) -> Self {
        Self {
            ctrl: ControlBlock::default(),
            buf: None,
            protection: protection.normalized(),
            sink,
            #[cfg(any(test, feature = "test-utils"))]
            behaviour: StackBehaviour::default(),
        }
    }

    /// Allocates the initial buffer of [`INIT_CAP`] poisoned slots.
    ///
    /// # Errors
    ///
    /// - [`StackError::NotEmpty`] if the stack is not in the zeroed state.
    /// - [`StackError::Alloc`] if the allocation fails; the stack stays zeroed.
    /// - [`StackError::Corrupted`] if the fresh stack fails verification.
    pub fn construct(&mut self) -> Result<(), StackError> {
        let result = self.try_construct();
        self.finish("construct", result)
    }

    /// Pushes `item` on top, doubling the capacity when full.
    ///
    /// # Errors
    ///
    /// - [`StackError::Corrupted`] if verification fails before the push
    ///   (nothing is pushed) or after it (the push is kept).
    /// - [`StackError::Alloc`] if growing fails; the stack is unchanged.
    pub fn push(&mut self, item: T) -> Result<(), StackError> {
        let result = self.try_push(item);
        self.finish("push", result)
    }

    /// Removes and returns the top item, halving the capacity once the stack
    /// has fallen to about a quarter of it.
    ///
    /// A failed shrink is logged and dumped but does not fail the pop: the
    /// item is returned and the larger buffer is kept.
    ///
    /// # Errors
    ///
    /// - [`StackError::EmptyPop`] if the stack holds no items.
    /// - [`StackError::Corrupted`] if verification fails before or after.
    pub fn pop(&mut self) -> Result<T, StackError> {
        let result = self.try_pop();
        self.finish("pop", result)
    }

    /// Like [`pop`](Self::pop), but returns the poison value on any failure.
    ///
    /// The poison value carries no meaning and must not be taken for data.
    pub fn pop_or_poison(&mut self) -> T {
        self.pop().unwrap_or_else(|_| poison())
    }

    /// Returns the top item without removing it, after verifying the stack.
    pub fn peek(&self) -> Result<Option<T>, StackError> {
        let result = self.try_peek();
        self.finish("peek", result)
    }

    /// Releases the buffer and zeroes every field. Idempotent.
    pub fn destruct(&mut self) {
        if self.buf.take().is_some() {
            tracing::trace!(capacity = self.ctrl.capacity, "stack buffer released");
        }

        self.ctrl = ControlBlock::default();
    }

    /// Runs every enabled check and returns the failed ones.
    ///
    /// A zeroed stack is checked in empty-instance mode.
    pub fn verify(&self) -> VerifyFlags {
        match self.buf {
            None if self.ctrl.capacity == 0 => {
                verify_empty(&self.ctrl, false, self.protection)
            }
            _ => verify(&self.ctrl, self.buf.as_ref(), self.protection),
        }
    }

    /// Renders the diagnostic report without emitting it.
    pub fn render_dump(&self) -> String {
        render(&self.ctrl, self.buf.as_ref(), self.protection)
    }

    /// Emits the diagnostic report to the sink.
    pub fn dump(&self) {
        self.sink.emit(&self.render_dump());
    }

    /// Number of items on the stack.
    #[inline]
    pub fn len(&self) -> usize {
        self.ctrl.size
    }

    /// Returns `true` if the stack holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ctrl.size == 0
    }

    /// Current capacity in items; zero when not constructed.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ctrl.capacity
    }

    /// Returns `true` while a buffer is allocated.
    #[inline]
    pub fn is_constructed(&self) -> bool {
        self.buf.is_some()
    }

    /// Protection layers in effect.
    #[inline]
    pub fn protection(&self) -> Protection {
        self.protection
    }

    /// Stored checksum; zero unless checksum protection is enabled.
    #[inline]
    pub fn checksum(&self) -> u64 {
        self.ctrl.checksum
    }

    /// The sink receiving dumps.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn try_construct(&mut self) -> Result<(), StackError> {
        if self.buf.is_some() {
            return Err(StackError::NotEmpty(VerifyFlags::ITEMS));
        }

        if self.protection.verify {
            let flags = verify_empty(&self.ctrl, false, self.protection);
            if !flags.is_empty() {
                return Err(StackError::NotEmpty(flags));
            }
        }

        self.ctrl.size = 0;
        self.resize(INIT_CAP, Resize::Construct)?;

        if self.protection.canary {
            self.ctrl.left_canary = CANARY;
            self.ctrl.right_canary = CANARY;
        }

        self.seal();
        self.check()
    }

    fn try_push(&mut self, item: T) -> Result<(), StackError> {
        self.check()?;

        if self.ctrl.size == self.ctrl.capacity {
            let capacity = match self.ctrl.capacity {
                0 => INIT_CAP,
                capacity => capacity
                    .checked_mul(CAP_FACTOR)
                    .filter(|c| *c <= CAP_MAX)
                    .ok_or(StackError::Alloc)?,
            };
            self.resize(capacity, Resize::Grow)?;
        }

        let size = self.ctrl.size;
        let buf = self
            .buf
            .as_mut()
            .ok_or(StackError::Corrupted(VerifyFlags::ITEMS))?;

        buf.slots_mut()[size] = item;
        self.ctrl.size += 1;

        self.seal();
        self.check()
    }

    fn try_pop(&mut self) -> Result<T, StackError> {
        self.check()?;

        if self.ctrl.size == 0 {
            tracing::warn!("pop from an empty stack");
            return Err(StackError::EmptyPop);
        }

        let index = self.ctrl.size - 1;
        let buf = self
            .buf
            .as_mut()
            .ok_or(StackError::Corrupted(VerifyFlags::ITEMS))?;

        let item = buf.slots()[index];
        poison_slots(&mut buf.slots_mut()[index..=index]);
        self.ctrl.size = index;

        // The item is already out: a failed shrink keeps the larger buffer.
        let shrink_failed = self.shrinkable()
            && self
                .resize(self.ctrl.capacity / CAP_FACTOR, Resize::Shrink)
                .is_err();

        self.seal();

        if shrink_failed {
            tracing::warn!(
                size = self.ctrl.size,
                capacity = self.ctrl.capacity,
                "stack shrink failed, keeping current capacity"
            );
            self.dump();
        }

        self.check()?;

        Ok(item)
    }

    fn try_peek(&self) -> Result<Option<T>, StackError> {
        self.check()?;

        let top = match (self.ctrl.size, self.buf.as_ref()) {
            (0, _) | (_, None) => None,
            (size, Some(buf)) => buf.slots().get(size - 1).copied(),
        };

        Ok(top)
    }

    /// Shrink policy, evaluated with the post-pop size.
    #[inline]
    fn shrinkable(&self) -> bool {
        self.ctrl.capacity > INIT_CAP
            && self.ctrl.capacity / (CAP_FACTOR * CAP_FACTOR) + 1 >= self.ctrl.size
    }

    fn resize(&mut self, capacity: usize, kind: Resize) -> Result<(), StackError> {
        #[cfg(any(test, feature = "test-utils"))]
        self.injected_failure(kind)?;

        let from = self.ctrl.capacity;

        match self.buf.as_mut() {
            Some(buf) => buf.resize(capacity, self.ctrl.size)?,
            None => self.buf = Some(RawBuf::allocate(capacity, self.protection.canary)?),
        }

        self.ctrl.capacity = capacity;
        tracing::debug!(?kind, from, to = capacity, "stack buffer resized");

        Ok(())
    }

    #[inline]
    fn seal(&mut self) {
        if !self.protection.hash {
            return;
        }

        if let Some(buf) = self.buf.as_ref() {
            self.ctrl.checksum = checksum(&self.ctrl, buf);
        }
    }

    #[inline]
    fn check(&self) -> Result<(), StackError> {
        if !self.protection.verify {
            return Ok(());
        }

        let flags = verify(&self.ctrl, self.buf.as_ref(), self.protection);
        if flags.is_empty() {
            Ok(())
        } else {
            Err(StackError::Corrupted(flags))
        }
    }

    /// Single exit path: every error is logged and dumped before returning.
    fn finish<R>(&self, op: &'static str, result: Result<R, StackError>) -> Result<R, StackError> {
        if let Err(err) = &result {
            tracing::error!(
                op,
                error = %err,
                size = self.ctrl.size,
                capacity = self.ctrl.capacity,
                "stack operation failed"
            );
            self.dump();
        }

        result
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl<T: StackItem, S: DumpSink> GuardedStack<T, S> {
    /// Changes the injected failure behaviour.
    pub fn change_behaviour(&mut self, behaviour: StackBehaviour) {
        self.behaviour = behaviour;
    }

    fn injected_failure(&self, kind: Resize) -> Result<(), StackError> {
        let fails = matches!(
            (self.behaviour, kind),
            (StackBehaviour::FailAtConstruct, Resize::Construct)
                | (StackBehaviour::FailAtGrow, Resize::Grow)
                | (StackBehaviour::FailAtShrink, Resize::Shrink)
        );

        if fails { Err(StackError::Alloc) } else { Ok(()) }
    }

    /// Overwrites the size field without touching the checksum.
    pub fn tamper_size(&mut self, size: usize) {
        self.ctrl.size = size;
    }

    /// Overwrites the capacity field without touching the buffer.
    pub fn tamper_capacity(&mut self, capacity: usize) {
        self.ctrl.capacity = capacity;
    }

    /// Overwrites the stored checksum.
    pub fn tamper_checksum(&mut self, checksum: u64) {
        self.ctrl.checksum = checksum;
    }

    /// Overwrites the control-block sentinels.
    pub fn tamper_stack_canaries(&mut self, left: usize, right: usize) {
        self.ctrl.left_canary = left;
        self.ctrl.right_canary = right;
    }

    /// Overwrites the buffer guard words; `None` leaves one untouched.
    pub fn tamper_guard_words(&mut self, left: Option<usize>, right: Option<usize>) {
        if let Some(buf) = self.buf.as_mut() {
            buf.overwrite_guards(left, right);
        }
    }

    /// Overwrites one byte of the slot region (slots and padding). Does
    /// nothing without a buffer.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is outside the region.
    pub fn tamper_region_byte(&mut self, offset: usize, byte: u8) {
        if let Some(buf) = self.buf.as_mut() {
            buf.region_bytes_mut()[offset] = byte;
        }
    }

    /// Reads a slot of the real allocation, poisoned or not.
    pub fn raw_slot(&self, index: usize) -> Option<T> {
        self.buf.as_ref().and_then(|buf| buf.slots().get(index).copied())
    }

    /// Current guard words, `None` without canaries or buffer.
    pub fn raw_guard_words(&self) -> Option<(usize, usize)> {
        let buf = self.buf.as_ref()?;
        Some((buf.left_guard()?, buf.right_guard()?))
    }

    /// Value the guard words must hold for the current buffer address.
    pub fn expected_guard_word(&self) -> Option<usize> {
        self.buf.as_ref().map(|buf| buf.expected_guard())
    }
}

impl<T: StackItem, S: DumpSink> core::fmt::Debug for GuardedStack<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GuardedStack")
            .field("size", &self.ctrl.size)
            .field("capacity", &self.ctrl.capacity)
            .field("protection", &self.protection)
            .field("buf", &self.buf)
            .finish_non_exhaustive()
    }
}
