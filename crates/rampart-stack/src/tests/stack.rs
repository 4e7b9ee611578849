// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Exhaustive tests for GuardedStack.

use crate::config::Protection;
use crate::consts::{CANARY, INIT_CAP};
use crate::error::StackError;
use crate::poison::{is_poison, poison};
use crate::stack::{GuardedStack, StackBehaviour};
use crate::verify::VerifyFlags;

use super::utils::{filled_stack, stack_with_sink};

// =============================================================================
// new() / construct()
// =============================================================================

#[test]
fn test_new_stack_is_zeroed() {
    let stack = GuardedStack::<u32>::with_protection(Protection::full());

    assert!(!stack.is_constructed());
    assert_eq!(stack.len(), 0);
    assert_eq!(stack.capacity(), 0);
    assert_eq!(stack.checksum(), 0);
    assert!(stack.verify().is_empty());
}

#[test]
fn test_default_uses_feature_selection() {
    let stack = GuardedStack::<u8>::default();

    assert_eq!(stack.protection(), Protection::from_features());
}

#[test]
fn test_construct_allocates_poisoned_buffer() {
    let (mut stack, sink) = stack_with_sink(Protection::full());

    stack.construct().expect("Failed to construct()");

    assert!(stack.is_constructed());
    assert!(stack.is_empty());
    assert_eq!(stack.capacity(), INIT_CAP);
    assert_ne!(stack.checksum(), 0);
    assert!(stack.verify().is_empty());
    assert!((0..INIT_CAP).all(|i| stack.raw_slot(i).is_some_and(|v| is_poison(&v))));
    assert!(sink.is_empty());
}

#[test]
fn test_construct_writes_guard_words() {
    let (mut stack, _) = stack_with_sink(Protection::full());
    stack.construct().expect("Failed to construct()");

    let expected = stack.expected_guard_word().expect("no buffer");

    assert_eq!(stack.raw_guard_words(), Some((expected, expected)));
}

#[test]
fn test_construct_twice_fails() {
    let (mut stack, sink) = filled_stack(Protection::full(), 3);

    let result = stack.construct();

    assert_eq!(result, Err(StackError::NotEmpty(VerifyFlags::ITEMS)));
    assert_eq!(sink.len(), 1);

    // The live stack is left as it was.
    assert_eq!(stack.len(), 3);
    assert!(stack.verify().is_empty());
}

#[test]
fn test_construct_on_dirty_instance_fails() {
    let (mut stack, _) = stack_with_sink(Protection::full());
    stack.tamper_size(4);

    let result = stack.construct();

    assert_eq!(result, Err(StackError::NotEmpty(VerifyFlags::SIZE)));
    assert!(!stack.is_constructed());
}

#[test]
fn test_construct_without_canary_leaves_sentinels_zero() {
    let (mut stack, _) = stack_with_sink(Protection::hash_only());

    stack.construct().expect("Failed to construct()");

    assert_eq!(stack.raw_guard_words(), None);
    assert!(stack.verify().is_empty());
}

// =============================================================================
// push()
// =============================================================================

#[test]
fn test_push_stores_in_order() {
    let (stack, _) = filled_stack(Protection::full(), 5);

    assert_eq!(stack.len(), 5);
    for i in 0..5 {
        assert_eq!(stack.raw_slot(i), Some(i as u32));
    }
    assert!(stack.raw_slot(5).is_some_and(|v| is_poison(&v)));
}

#[test]
fn test_push_grows_when_full() {
    let (mut stack, _) = filled_stack(Protection::full(), INIT_CAP as u32);
    assert_eq!(stack.capacity(), INIT_CAP);

    stack.push(100).expect("Failed to push()");

    assert_eq!(stack.capacity(), 2 * INIT_CAP);
    assert_eq!(stack.len(), INIT_CAP + 1);
    assert!(stack.verify().is_empty());
}

#[test]
fn test_growth_preserves_items_and_poisons_tail() {
    let (stack, _) = filled_stack(Protection::full(), 9);

    for i in 0..9 {
        assert_eq!(stack.raw_slot(i), Some(i as u32));
    }
    for i in 9..16 {
        assert!(stack.raw_slot(i).is_some_and(|v| is_poison(&v)));
    }
}

#[test]
fn test_growth_rebinds_guard_words() {
    let (stack, _) = filled_stack(Protection::full(), 40);
    let expected = stack.expected_guard_word().expect("no buffer");

    assert_eq!(stack.capacity(), 64);
    assert_eq!(stack.raw_guard_words(), Some((expected, expected)));
}

#[test]
fn test_push_on_unconstructed_stack_is_corrupted() {
    let (mut stack, sink) = stack_with_sink(Protection::full());

    let err = stack.push(1).expect_err("push() should fail");

    assert!(matches!(err, StackError::Corrupted(_)));
    assert!(err.flags().contains(VerifyFlags::CAPACITY | VerifyFlags::ITEMS));
    assert!(!stack.is_constructed());
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_push_accepts_poison_lookalike() {
    let (mut stack, _) = filled_stack(Protection::full(), 0);

    stack.push(poison()).expect("Failed to push()");

    assert_eq!(stack.len(), 1);
    assert!(stack.verify().is_empty());
    assert_eq!(stack.pop(), Ok(poison()));
}

// =============================================================================
// pop()
// =============================================================================

#[test]
fn test_pop_is_lifo() {
    let (mut stack, _) = filled_stack(Protection::full(), 4);

    assert_eq!(stack.pop(), Ok(3));
    assert_eq!(stack.pop(), Ok(2));
    assert_eq!(stack.pop(), Ok(1));
    assert_eq!(stack.pop(), Ok(0));
    assert!(stack.is_empty());
}

#[test]
fn test_pop_poisons_vacated_slot() {
    let (mut stack, _) = filled_stack(Protection::full(), 2);

    stack.pop().expect("Failed to pop()");

    assert_eq!(stack.raw_slot(0), Some(0));
    assert!(stack.raw_slot(1).is_some_and(|v| is_poison(&v)));
    assert!(stack.verify().is_empty());
}

#[test]
fn test_pop_empty_fails_without_side_effects() {
    let (mut stack, sink) = filled_stack(Protection::full(), 0);
    let checksum = stack.checksum();

    assert_eq!(stack.pop(), Err(StackError::EmptyPop));

    assert_eq!(stack.len(), 0);
    assert_eq!(stack.capacity(), INIT_CAP);
    assert_eq!(stack.checksum(), checksum);
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_pop_or_poison_returns_poison_when_empty() {
    let (mut stack, sink) = filled_stack(Protection::full(), 1);

    assert_eq!(stack.pop_or_poison(), 0);
    assert_eq!(stack.pop_or_poison(), 0x7575_7575);
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_pop_shrinks_at_quarter() {
    let (mut stack, _) = filled_stack(Protection::full(), 9);
    assert_eq!(stack.capacity(), 16);

    // Sizes 8, 7 and 6 keep the larger buffer.
    for expected in [8, 7, 6] {
        assert_eq!(stack.pop(), Ok(expected));
        assert_eq!(stack.capacity(), 16);
    }

    // 16 / 4 + 1 >= 5
    assert_eq!(stack.pop(), Ok(5));
    assert_eq!(stack.capacity(), 8);
    assert_eq!(stack.len(), 5);
    assert!(stack.verify().is_empty());

    for i in 0..5 {
        assert_eq!(stack.raw_slot(i), Some(i as u32));
    }
    for i in 5..8 {
        assert!(stack.raw_slot(i).is_some_and(|v| is_poison(&v)));
    }
}

#[test]
fn test_pop_never_shrinks_below_initial_capacity() {
    let (mut stack, _) = filled_stack(Protection::full(), 9);

    while stack.pop().is_ok() {}

    assert_eq!(stack.len(), 0);
    assert_eq!(stack.capacity(), INIT_CAP);
}

#[test]
fn test_pop_shrinks_in_steps() {
    let (mut stack, _) = filled_stack(Protection::full(), 33);
    assert_eq!(stack.capacity(), 64);

    while stack.len() > 17 {
        stack.pop().expect("Failed to pop()");
    }
    assert_eq!(stack.capacity(), 32);

    while stack.len() > 9 {
        stack.pop().expect("Failed to pop()");
    }
    assert_eq!(stack.capacity(), 16);
    assert!(stack.verify().is_empty());
}

#[test]
fn test_pop_on_unconstructed_stack_is_corrupted() {
    let (mut stack, sink) = stack_with_sink(Protection::full());

    assert!(matches!(stack.pop(), Err(StackError::Corrupted(_))));
    assert_eq!(sink.len(), 1);
}

// =============================================================================
// peek()
// =============================================================================

#[test]
fn test_peek_reads_top_without_removing() {
    let (mut stack, _) = filled_stack(Protection::full(), 0);

    assert_eq!(stack.peek(), Ok(None));

    stack.push(3).expect("Failed to push()");

    assert_eq!(stack.peek(), Ok(Some(3)));
    assert_eq!(stack.len(), 1);
}

#[test]
fn test_peek_reports_corruption() {
    let (mut stack, sink) = filled_stack(Protection::full(), 2);
    stack.tamper_checksum(0);

    assert_eq!(
        stack.peek(),
        Err(StackError::Corrupted(VerifyFlags::CHECKSUM))
    );
    assert_eq!(sink.len(), 1);
}

// =============================================================================
// destruct()
// =============================================================================

#[test]
fn test_destruct_returns_to_zeroed_state() {
    let (mut stack, _) = filled_stack(Protection::full(), 12);

    stack.destruct();

    assert!(!stack.is_constructed());
    assert_eq!(stack.len(), 0);
    assert_eq!(stack.capacity(), 0);
    assert_eq!(stack.checksum(), 0);
    assert!(stack.verify().is_empty());
}

#[test]
fn test_destruct_is_idempotent() {
    let (mut stack, _) = filled_stack(Protection::full(), 1);

    stack.destruct();
    stack.destruct();

    assert!(stack.verify().is_empty());
}

#[test]
fn test_destruct_on_zeroed_stack() {
    let mut stack = GuardedStack::<u64>::with_protection(Protection::full());

    stack.destruct();

    assert!(!stack.is_constructed());
}

#[test]
fn test_reconstruct_after_destruct() {
    let (mut stack, sink) = filled_stack(Protection::full(), 20);
    stack.destruct();

    stack.construct().expect("Failed to construct()");
    stack.push(9).expect("Failed to push()");

    assert_eq!(stack.capacity(), INIT_CAP);
    assert_eq!(stack.pop(), Ok(9));
    assert!(sink.is_empty());
}

// =============================================================================
// corruption detection
// =============================================================================

#[test]
fn test_left_guard_overwrite_is_detected() {
    let (mut stack, sink) = filled_stack(Protection::full(), 1);
    stack.tamper_guard_words(Some(0), None);

    assert_eq!(stack.verify(), VerifyFlags::DATA_LEFT_CANARY);
    assert_eq!(
        stack.push(2),
        Err(StackError::Corrupted(VerifyFlags::DATA_LEFT_CANARY))
    );

    // Nothing was pushed, and the failure was dumped.
    assert_eq!(stack.len(), 1);
    assert_eq!(sink.len(), 1);
    assert!(sink.last().is_some_and(|r| r.contains("error")));
}

#[test]
fn test_right_guard_overwrite_is_detected() {
    let (mut stack, _) = filled_stack(Protection::full(), 1);
    stack.tamper_guard_words(None, Some(CANARY));

    assert_eq!(
        stack.pop(),
        Err(StackError::Corrupted(VerifyFlags::DATA_RIGHT_CANARY))
    );
    assert_eq!(stack.len(), 1);
}

#[test]
fn test_stack_canary_overwrite_is_detected() {
    let (mut stack, _) = filled_stack(Protection::full(), 1);
    stack.tamper_stack_canaries(0, CANARY);

    // The sentinels are part of the hashed image.
    assert_eq!(
        stack.verify(),
        VerifyFlags::STACK_LEFT_CANARY | VerifyFlags::CHECKSUM
    );
}

#[test]
fn test_stack_canary_overwrite_without_hash() {
    let (mut stack, _) = filled_stack(Protection::canary_only(), 1);
    stack.tamper_stack_canaries(CANARY, 1);

    assert_eq!(stack.verify(), VerifyFlags::STACK_RIGHT_CANARY);
}

#[test]
fn test_used_slot_overwrite_breaks_checksum() {
    let (mut stack, _) = filled_stack(Protection::full(), 2);
    stack.tamper_region_byte(0, 0xFF);

    assert_eq!(stack.verify(), VerifyFlags::CHECKSUM);
    assert_eq!(stack.pop(), Err(StackError::Corrupted(VerifyFlags::CHECKSUM)));
}

#[test]
fn test_unused_slot_overwrite_breaks_checksum_and_poison() {
    let (mut stack, _) = filled_stack(Protection::full(), 2);
    stack.tamper_region_byte(4 * 5, 0);

    assert_eq!(stack.verify(), VerifyFlags::CHECKSUM | VerifyFlags::POISON);
}

#[test]
fn test_hash_only_reports_checksum_only() {
    let (mut stack, _) = filled_stack(Protection::hash_only(), 2);
    stack.tamper_region_byte(4 * 5, 0);

    assert_eq!(stack.verify(), VerifyFlags::CHECKSUM);
}

#[test]
fn test_canary_only_misses_in_bounds_writes() {
    let (mut stack, _) = filled_stack(Protection::canary_only(), 2);
    stack.tamper_region_byte(4 * 5, 0);

    assert!(stack.verify().is_empty());
}

#[test]
fn test_size_overwrite_is_detected() {
    let (mut stack, sink) = filled_stack(Protection::full(), 2);
    stack.tamper_size(INIT_CAP + 1);

    assert_eq!(stack.verify(), VerifyFlags::SIZE | VerifyFlags::CHECKSUM);
    assert!(matches!(stack.push(1), Err(StackError::Corrupted(_))));
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_size_overwrite_without_layers() {
    let (mut stack, _) = filled_stack(Protection::none(), 2);
    stack.tamper_size(INIT_CAP + 1);

    assert_eq!(stack.verify(), VerifyFlags::SIZE);
}

#[test]
fn test_capacity_overwrite_is_detected() {
    let (mut stack, _) = filled_stack(Protection::canary_only(), 2);

    stack.tamper_capacity(4);
    assert_eq!(stack.verify(), VerifyFlags::CAPACITY);

    stack.tamper_capacity(2 * INIT_CAP);
    assert_eq!(stack.verify(), VerifyFlags::CAPACITY);
}

#[test]
fn test_checksum_overwrite_is_detected() {
    let (mut stack, _) = filled_stack(Protection::full(), 2);
    stack.tamper_checksum(!stack.checksum());

    assert_eq!(stack.verify(), VerifyFlags::CHECKSUM);
}

// =============================================================================
// failure injection
// =============================================================================

#[test]
fn test_fail_at_construct() {
    let (mut stack, sink) = stack_with_sink(Protection::full());
    stack.change_behaviour(StackBehaviour::FailAtConstruct);

    assert_eq!(stack.construct(), Err(StackError::Alloc));

    assert!(!stack.is_constructed());
    assert_eq!(stack.capacity(), 0);
    assert!(stack.verify().is_empty());
    assert_eq!(sink.len(), 1);

    stack.change_behaviour(StackBehaviour::None);
    stack.construct().expect("Failed to construct()");
}

#[test]
fn test_fail_at_grow_leaves_stack_unchanged() {
    let (mut stack, sink) = filled_stack(Protection::full(), INIT_CAP as u32);
    let checksum = stack.checksum();
    stack.change_behaviour(StackBehaviour::FailAtGrow);

    assert_eq!(stack.push(99), Err(StackError::Alloc));

    assert_eq!(stack.len(), INIT_CAP);
    assert_eq!(stack.capacity(), INIT_CAP);
    assert_eq!(stack.checksum(), checksum);
    assert!(stack.verify().is_empty());
    assert_eq!(sink.len(), 1);
    assert_eq!(stack.pop(), Ok(INIT_CAP as u32 - 1));
}

#[test]
fn test_fail_at_grow_does_not_affect_pushes_within_capacity() {
    let (mut stack, _) = filled_stack(Protection::full(), 0);
    stack.change_behaviour(StackBehaviour::FailAtGrow);

    for i in 0..INIT_CAP as u32 {
        stack.push(i).expect("Failed to push()");
    }
}

#[test]
fn test_fail_at_shrink_still_returns_item() {
    let (mut stack, sink) = filled_stack(Protection::full(), 9);
    stack.change_behaviour(StackBehaviour::FailAtShrink);

    for expected in [8, 7, 6] {
        assert_eq!(stack.pop(), Ok(expected));
    }
    assert!(sink.is_empty());

    assert_eq!(stack.pop(), Ok(5));

    assert_eq!(stack.len(), 5);
    assert_eq!(stack.capacity(), 16);
    assert!(stack.verify().is_empty());
    assert_eq!(sink.len(), 1);
    assert!(stack.raw_slot(5).is_some_and(|v| is_poison(&v)));
}

// =============================================================================
// unprotected mode
// =============================================================================

#[test]
fn test_unprotected_grows_from_zero() {
    let mut stack = GuardedStack::<i16>::with_protection(Protection::unprotected());

    stack.push(-1).expect("Failed to push()");
    stack.push(2).expect("Failed to push()");

    assert!(stack.is_constructed());
    assert_eq!(stack.capacity(), INIT_CAP);
    assert_eq!(stack.pop(), Ok(2));
    assert_eq!(stack.pop(), Ok(-1));
    assert_eq!(stack.pop(), Err(StackError::EmptyPop));
}

#[test]
fn test_unprotected_skips_verification() {
    let (mut stack, sink) = filled_stack(Protection::unprotected(), 2);
    stack.tamper_checksum(123);

    stack.push(3).expect("Failed to push()");

    assert_eq!(stack.checksum(), 123);
    assert_eq!(stack.raw_guard_words(), None);
    assert!(sink.is_empty());
}

#[test]
fn test_unverified_selection_is_normalized() {
    let stack = GuardedStack::<u8>::with_protection(Protection {
        canary: true,
        hash: true,
        poison: false,
        verify: false,
    });

    assert_eq!(stack.protection(), Protection::unprotected());
}

// =============================================================================
// element types
// =============================================================================

#[test]
fn test_float_items() {
    let mut stack = GuardedStack::<f64>::with_protection(Protection::full());
    stack.construct().expect("Failed to construct()");

    for i in 0..20 {
        stack.push(i as f64 * 0.5).expect("Failed to push()");
    }

    assert_eq!(stack.pop(), Ok(9.5));
    assert!(stack.verify().is_empty());
}

#[test]
fn test_byte_items() {
    let mut stack = GuardedStack::<u8>::with_protection(Protection::full());
    stack.construct().expect("Failed to construct()");

    for b in b"rampart!!" {
        stack.push(*b).expect("Failed to push()");
    }

    assert_eq!(stack.capacity(), 16);
    assert_eq!(stack.pop(), Ok(b'!'));
    assert!(stack.verify().is_empty());
}

// =============================================================================
// ownership
// =============================================================================

#[test]
fn test_stack_is_send() {
    fn assert_send<S: Send>() {}

    assert_send::<GuardedStack<u64>>();
    assert_send::<GuardedStack<f32>>();
}

#[test]
fn test_stack_moves_across_threads() {
    let mut stack = GuardedStack::<u32>::with_protection(Protection::full());
    stack.construct().expect("Failed to construct()");
    for i in 0..10 {
        stack.push(i).expect("Failed to push()");
    }

    let mut stack = std::thread::spawn(move || {
        assert!(stack.verify().is_empty());
        stack.push(10).expect("Failed to push()");
        stack
    })
    .join()
    .expect("thread panicked");

    // Guard words and checksum are bound to the buffer, not the thread.
    assert!(stack.verify().is_empty());
    assert_eq!(stack.pop(), Ok(10));
}
