use rust_alloc::vec::Vec;

use super::{ArenaStack, ContextKind};
use crate::alloc::{Allocation, ArenaId};
use crate::config::ArenaStackConfig;
use crate::error::ArenaStackError;

#[test]
fn fresh_stack_has_only_heap_bottom() {
    let stack = ArenaStack::new();
    assert_eq!(stack.depth(), 1);
    assert_eq!(stack.top(), ContextKind::Heap);
    assert_eq!(stack.current_arena(), None);
    assert_eq!(stack.live_arenas(), 0);
}

// push, allocate twice, pop, then fail to pop the bottom
#[test]
fn arena_round_trip_scenario() {
    let mut stack = ArenaStack::new();
    let id = stack.push_arena(64).unwrap();
    assert_eq!(stack.top(), ContextKind::Arena(id));

    let first = stack.allocate(10, 8).unwrap();
    assert_eq!(first.arena_offset(), Some(0));
    assert_eq!(stack.remaining(), Some(54));

    let second = stack.allocate(10, 8).unwrap();
    assert_eq!(second.arena_offset(), Some(16));
    assert_eq!(stack.remaining(), Some(38));

    assert_eq!(stack.pop(), Ok(ContextKind::Arena(id)));
    assert_eq!(stack.live_arenas(), 0);
    assert_eq!(stack.pop(), Err(ArenaStackError::EmptyStackUnderflow));
    assert_eq!(stack.depth(), 1);
}

#[test]
fn heap_context_hands_out_owned_blocks() {
    let mut stack = ArenaStack::new();
    stack.push_arena(32).unwrap();
    stack.push_heap();

    let allocation = stack.allocate(128, 16).unwrap();
    assert!(!allocation.is_arena());
    assert_eq!(allocation.len(), 128);
    assert_eq!(allocation.as_non_null().as_ptr() as usize % 16, 0);
    assert!(!stack.owns(allocation.as_non_null()));

    // the arena below is untouched
    stack.pop().unwrap();
    assert_eq!(stack.remaining(), Some(32));

    let block = allocation.into_heap().unwrap();
    // SAFETY: zero_fill is on by default.
    assert!(unsafe { block.as_slice() }.iter().all(|&b| b == 0));
}

#[test]
fn exhausted_arena_does_not_spill_to_heap() {
    let mut stack = ArenaStack::new();
    stack.push_arena(16).unwrap();
    stack.allocate(12, 4).unwrap();

    let err = stack.allocate(8, 4).unwrap_err();
    assert_eq!(
        err,
        ArenaStackError::ArenaExhausted {
            requested: 8,
            offset: 12,
            capacity: 16,
        }
    );
    assert_eq!(stack.remaining(), Some(4));
    assert!(stack.allocate(4, 4).unwrap().is_arena());
}

#[test]
fn invalid_alignment_is_rejected_in_every_context() {
    let mut stack = ArenaStack::new();
    for align in [0, 3, 6, 12, 24] {
        assert_eq!(
            stack.allocate(8, align).unwrap_err(),
            ArenaStackError::InvalidAlignment { align }
        );
    }

    stack.push_arena(64).unwrap();
    assert_eq!(
        stack.allocate(8, 3).unwrap_err(),
        ArenaStackError::InvalidAlignment { align: 3 }
    );
    // nothing was consumed
    assert_eq!(stack.remaining(), Some(64));
}

#[test]
fn capacity_bounds_are_enforced() {
    let config = ArenaStackConfig::default().with_max_capacity(1024);
    let mut stack = ArenaStack::with_config(config).unwrap();

    assert_eq!(
        stack.push_arena(0).unwrap_err(),
        ArenaStackError::InvalidCapacity {
            capacity: 0,
            max: 1024,
        }
    );
    assert!(matches!(
        stack.push_arena(1025),
        Err(ArenaStackError::InvalidCapacity { capacity: 1025, .. })
    ));
    assert_eq!(stack.depth(), 1);
    assert!(stack.push_arena(1024).is_ok());
}

#[test]
fn reset_releases_everything() {
    let mut stack = ArenaStack::new();
    stack.push_arena(64).unwrap();
    stack.push_heap();
    stack.push_arena(64).unwrap();
    assert_eq!(stack.live_arenas(), 2);

    stack.reset();
    assert_eq!(stack.depth(), 1);
    assert_eq!(stack.top(), ContextKind::Heap);
    assert_eq!(stack.live_arenas(), 0);

    let allocation = stack.allocate(8, 8).unwrap();
    assert!(matches!(allocation, Allocation::Heap(_)));
}

#[test]
fn new_arena_after_pop_starts_at_zero() {
    let mut stack = ArenaStack::new();
    stack.push_arena(64).unwrap();
    stack.allocate(40, 1).unwrap();
    stack.pop().unwrap();

    stack.push_arena(64).unwrap();
    assert_eq!(stack.remaining(), Some(64));
    assert_eq!(stack.allocate(1, 1).unwrap().arena_offset(), Some(0));
}

#[test]
fn push_existing_shares_cursor_and_defers_release() {
    let mut stack = ArenaStack::new();
    let id = stack.push_arena(64).unwrap();
    stack.allocate(8, 8).unwrap();

    stack.push_heap();
    stack.push_existing(id).unwrap();
    assert_eq!(stack.current_arena(), Some(id));
    assert_eq!(stack.allocate(8, 8).unwrap().arena_offset(), Some(8));

    stack.pop().unwrap();
    assert_eq!(stack.live_arenas(), 1);
    stack.pop().unwrap();
    assert_eq!(stack.allocate(8, 8).unwrap().arena_offset(), Some(16));

    stack.pop().unwrap();
    assert_eq!(stack.live_arenas(), 0);
    assert_eq!(
        stack.push_existing(id),
        Err(ArenaStackError::UnknownArena { id })
    );
}

#[test]
fn ids_are_not_reused_immediately() {
    let mut stack = ArenaStack::new();
    let first = stack.push_arena(8).unwrap();
    stack.pop().unwrap();
    let second = stack.push_arena(8).unwrap();
    assert_ne!(first, second);
}

#[test]
fn id_space_exhaustion_and_wraparound() {
    let config = ArenaStackConfig::default().with_max_arenas(3);
    let mut stack = ArenaStack::with_config(config).unwrap();

    let ids: Vec<ArenaId> = (0..3).map(|_| stack.push_arena(8).unwrap()).collect();
    assert_eq!(ids, [ArenaId(1), ArenaId(2), ArenaId(0)]);
    assert_eq!(
        stack.push_arena(8),
        Err(ArenaStackError::ArenaIdsExhausted { max: 3 })
    );
    assert_eq!(stack.depth(), 4);

    // only the top id is free again
    stack.pop().unwrap();
    assert_eq!(stack.push_arena(8), Ok(ArenaId(0)));
}

#[test]
fn owns_tracks_live_arena_buffers() {
    let mut stack = ArenaStack::new();
    stack.push_arena(64).unwrap();
    let region = stack.allocate(16, 8).unwrap();
    let ptr = region.as_non_null();
    assert!(stack.owns(ptr));

    stack.pop().unwrap();
    assert!(!stack.owns(ptr));
}

#[test]
fn peek_points_at_next_free_byte() {
    let mut stack = ArenaStack::new();
    assert!(stack.peek().is_none());

    stack.push_arena(64).unwrap();
    let before = stack.peek().unwrap();
    let allocation = stack.allocate(4, 1).unwrap();
    assert_eq!(allocation.as_non_null(), before);
    assert_eq!(stack.peek().unwrap().as_ptr() as usize, before.as_ptr() as usize + 4);
}

#[test]
fn alignment_above_page_size_is_served_from_arena() {
    let mut stack = ArenaStack::new();
    let id = stack.push_arena(1 << 16).unwrap();

    let allocation = stack.allocate(8, 8192).unwrap();
    assert_eq!(allocation.arena_id(), Some(id));
    assert_eq!(allocation.as_non_null().as_ptr() as usize % 8192, 0);

    // the heap serves the same alignment
    stack.push_heap();
    let allocation = stack.allocate(8, 8192).unwrap();
    assert_eq!(allocation.as_non_null().as_ptr() as usize % 8192, 0);
}

#[test]
fn small_buffer_alignment_keeps_addresses_aligned() {
    let config = ArenaStackConfig::default().with_buffer_align(16);
    let mut stack = ArenaStack::with_config(config).unwrap();
    stack.push_arena(256).unwrap();
    stack.allocate(1, 1).unwrap();

    let allocation = stack.allocate(8, 64).unwrap();
    assert_eq!(allocation.as_non_null().as_ptr() as usize % 64, 0);
    assert_eq!(stack.peek().unwrap().as_ptr() as usize % 8, 0);
}

#[test]
fn zero_fill_can_be_disabled() {
    let config = ArenaStackConfig::default().with_zero_fill(false);
    let mut stack = ArenaStack::with_config(config).unwrap();
    stack.push_arena(32).unwrap();
    let region = match stack.allocate(32, 1).unwrap() {
        Allocation::Arena(region) => region,
        Allocation::Heap(_) => panic!("expected an arena region"),
    };
    // SAFETY: the arena is on top and nothing else borrows the region.
    unsafe { region.as_non_null().write_bytes(0x5A, region.len()) };
    assert_eq!(unsafe { region.as_slice() }[31], 0x5A);
}

#[test]
fn scope_pops_on_drop() {
    let mut stack = ArenaStack::new();
    {
        let mut scope = stack.enter_arena(64).unwrap();
        let id = scope.arena_id().unwrap();
        assert_eq!(scope.current_arena(), Some(id));
        scope.allocate(8, 8).unwrap();

        // left unpopped on purpose
        scope.push_heap();
        scope.push_arena(16).unwrap();
        assert_eq!(scope.depth(), 4);
    }
    assert_eq!(stack.depth(), 1);
    assert_eq!(stack.live_arenas(), 0);
}

#[test]
fn nested_scopes_unwind_in_order() {
    let mut stack = ArenaStack::new();
    let mut outer = stack.enter_arena(64).unwrap();
    let outer_id = outer.arena_id();
    {
        let inner = outer.enter_heap();
        assert_eq!(inner.top(), ContextKind::Heap);
        assert_eq!(inner.depth(), 3);
    }
    assert_eq!(outer.current_arena(), outer_id);
    drop(outer);
    assert_eq!(stack.depth(), 1);
}

#[test]
fn with_arena_pops_after_error_path() {
    let mut stack = ArenaStack::new();
    let result = stack.with_arena(16, |stack| {
        stack.allocate(8, 8)?;
        stack.allocate(16, 8)?;
        Ok::<_, ArenaStackError>(())
    });
    assert!(matches!(
        result,
        Ok(Err(ArenaStackError::ArenaExhausted { .. }))
    ));
    assert_eq!(stack.depth(), 1);
}

#[test]
fn failed_scope_entry_leaves_stack_alone() {
    let mut stack = ArenaStack::new();
    assert!(stack.enter_arena(0).is_err());
    assert_eq!(stack.depth(), 1);
}

#[test]
fn rejects_invalid_config() {
    let config = ArenaStackConfig::default().with_buffer_align(3);
    assert!(matches!(
        ArenaStack::with_config(config),
        Err(ArenaStackError::InvalidConfig { .. })
    ));
}
