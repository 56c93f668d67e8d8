//! The allocation context stack.
//!
//! design: contexts are kept in a `Vec` whose first element is always a
//! heap context. Arena contexts hold their arena through an `Rc` so that
//! [`ArenaStack::push_existing`] can stack the same arena more than once;
//! the buffer goes away with the last context that refers to it. A side
//! table keyed by [`ArenaId`] finds live arenas without walking the stack.

use core::ptr::NonNull;

use hashbrown::HashMap;
use rust_alloc::alloc::Layout;
use rust_alloc::rc::{Rc, Weak};
use rust_alloc::vec::Vec;
use rustc_hash::FxBuildHasher;
use tracing::{debug, trace, warn};

use crate::alloc::{Allocation, Arena, ArenaId, HeapBlock};
use crate::config::ArenaStackConfig;
use crate::error::ArenaStackError;

mod scope;

pub use scope::ArenaScope;

#[cfg(test)]
mod tests;

type ArenaRegistry = HashMap<ArenaId, Weak<Arena>, FxBuildHasher>;

#[derive(Debug)]
enum Context {
    Heap,
    Arena(Rc<Arena>),
}

impl Context {
    fn kind(&self) -> ContextKind {
        match self {
            Self::Heap => ContextKind::Heap,
            Self::Arena(arena) => ContextKind::Arena(arena.id()),
        }
    }
}

/// What kind of context sits at some position of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// Allocations go to the global heap.
    Heap,
    /// Allocations are bumped out of the arena with this id.
    Arena(ArenaId),
}

/// A stack of allocation contexts with a heap context at the bottom.
///
/// Not thread safe: the stack is meant to be owned by one thread and used
/// like a call stack, pushing on scope entry and popping on scope exit.
/// [`ArenaStack::enter_arena`] ties the pop to a guard so it happens on
/// every exit path.
#[derive(Debug)]
pub struct ArenaStack {
    config: ArenaStackConfig,
    contexts: Vec<Context>,
    live: ArenaRegistry,
    // id space is walked from here so released ids are reused late
    last_id: u32,
}

impl Default for ArenaStack {
    fn default() -> Self {
        Self::from_validated(ArenaStackConfig::default())
    }
}

impl ArenaStack {
    /// A stack holding only the bottom heap context, with default
    /// configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ArenaStackConfig) -> Result<Self, ArenaStackError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: ArenaStackConfig) -> Self {
        let mut contexts = Vec::with_capacity(8);
        contexts.push(Context::Heap);
        Self {
            config,
            contexts,
            live: ArenaRegistry::default(),
            last_id: 0,
        }
    }

    pub fn config(&self) -> &ArenaStackConfig {
        &self.config
    }

    /// Number of contexts on the stack, including the bottom heap context.
    pub fn depth(&self) -> usize {
        self.contexts.len()
    }

    /// The context allocations currently go to.
    pub fn top(&self) -> ContextKind {
        self.contexts.last().map_or(ContextKind::Heap, Context::kind)
    }

    /// Id of the top arena, or `None` when a heap context is on top.
    pub fn current_arena(&self) -> Option<ArenaId> {
        self.top_arena().map(|arena| arena.id())
    }

    /// Number of distinct arenas alive on this stack.
    pub fn live_arenas(&self) -> usize {
        self.live.len()
    }

    /// Free bytes left in the top arena.
    pub fn remaining(&self) -> Option<usize> {
        self.top_arena().map(|arena| arena.remaining())
    }

    /// Address the next top-arena allocation would start at, before
    /// alignment padding.
    pub fn peek(&self) -> Option<NonNull<u8>> {
        self.top_arena().map(|arena| arena.next_ptr())
    }

    /// Whether `ptr` points into the buffer of an arena alive on this stack.
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        self.live
            .values()
            .filter_map(Weak::upgrade)
            .any(|arena| arena.contains(ptr))
    }

    fn top_arena(&self) -> Option<&Rc<Arena>> {
        match self.contexts.last() {
            Some(Context::Arena(arena)) => Some(arena),
            Some(Context::Heap) | None => None,
        }
    }
}

// ==== Stack transitions ====

impl ArenaStack {
    /// Drop every context except the bottom heap context. All arena buffers
    /// are released.
    pub fn reset(&mut self) {
        let released = self.live.len();
        self.contexts.clear();
        self.contexts.push(Context::Heap);
        self.live.clear();
        debug!(released, "arena stack reset");
    }

    /// Push a fresh arena of `capacity` bytes and make it the top context.
    pub fn push_arena(&mut self, capacity: usize) -> Result<ArenaId, ArenaStackError> {
        let max = self.config.max_capacity;
        if capacity == 0 || capacity > max {
            return Err(ArenaStackError::InvalidCapacity { capacity, max });
        }

        let id = self.next_id()?;
        let arena = Rc::new(Arena::try_init(id, capacity, self.config.buffer_align)?);

        self.last_id = id.as_u32();
        self.live.insert(id, Rc::downgrade(&arena));
        self.contexts.push(Context::Arena(arena));
        debug!(arena = %id, capacity, depth = self.depth(), "pushed arena");
        Ok(id)
    }

    /// Push a heap context. Allocations go to the global heap until it is
    /// popped.
    pub fn push_heap(&mut self) {
        self.contexts.push(Context::Heap);
        debug!(depth = self.depth(), "pushed heap");
    }

    /// Push another context for an arena that is already live on this
    /// stack. Both contexts share the arena's cursor; its buffer is released
    /// when the last of them is popped.
    pub fn push_existing(&mut self, id: ArenaId) -> Result<(), ArenaStackError> {
        let arena = self
            .live
            .get(&id)
            .and_then(Weak::upgrade)
            .ok_or(ArenaStackError::UnknownArena { id })?;
        self.contexts.push(Context::Arena(arena));
        debug!(arena = %id, depth = self.depth(), "pushed existing arena");
        Ok(())
    }

    /// Remove the top context and report what it was.
    ///
    /// The bottom heap context can't be popped. Popping an arena context
    /// frees its whole buffer at once; no destructors run for values placed
    /// in it.
    pub fn pop(&mut self) -> Result<ContextKind, ArenaStackError> {
        if self.contexts.len() <= 1 {
            debug!("pop rejected at bottom heap context");
            return Err(ArenaStackError::EmptyStackUnderflow);
        }
        let context = self
            .contexts
            .pop()
            .ok_or(ArenaStackError::EmptyStackUnderflow)?;
        let kind = context.kind();
        self.release(context);
        debug!(popped = ?kind, depth = self.depth(), "popped context");
        Ok(kind)
    }

    /// Pop until at most `depth` contexts remain (never below the bottom).
    pub(crate) fn unwind_to(&mut self, depth: usize) {
        while self.contexts.len() > depth.max(1) {
            if self.pop().is_err() {
                break;
            }
        }
    }

    fn release(&mut self, context: Context) {
        if let Context::Arena(arena) = context {
            if Rc::strong_count(&arena) == 1 {
                self.live.remove(&arena.id());
                debug!(
                    arena = %arena.id(),
                    capacity = arena.capacity(),
                    used = arena.offset(),
                    "released arena"
                );
            }
        }
    }

    fn next_id(&self) -> Result<ArenaId, ArenaStackError> {
        let max = self.config.max_arenas;
        (1..=u64::from(max))
            .map(|step| ((u64::from(self.last_id) + step) % u64::from(max)) as u32)
            .map(ArenaId)
            .find(|id| !self.live.contains_key(id))
            .ok_or_else(|| {
                warn!(max, "no free arena id");
                ArenaStackError::ArenaIdsExhausted { max }
            })
    }
}

// ==== Allocation ====

impl ArenaStack {
    /// Allocate `size` bytes aligned to `align` from the top context.
    ///
    /// Arena contexts never grow and never spill to the heap: a request that
    /// does not fit fails with [`ArenaStackError::ArenaExhausted`] and leaves
    /// the arena untouched.
    pub fn allocate(&mut self, size: usize, align: usize) -> Result<Allocation, ArenaStackError> {
        if !align.is_power_of_two() {
            return Err(ArenaStackError::InvalidAlignment { align });
        }
        let zeroed = self.config.zero_fill;

        match self.contexts.last() {
            Some(Context::Arena(arena)) => {
                let region = arena
                    .try_alloc_bytes(size, align, zeroed)
                    .inspect_err(|err| warn!(arena = %arena.id(), %err, "arena allocation failed"))?;
                trace!(
                    arena = %arena.id(),
                    offset = region.offset(),
                    size,
                    align,
                    "arena allocation"
                );
                Ok(Allocation::Arena(region))
            }
            Some(Context::Heap) | None => {
                let layout = Layout::from_size_align(size, align)
                    .map_err(|_| ArenaStackError::AllocationFailure { size, align })?;
                let block = HeapBlock::try_alloc(layout, zeroed)?;
                trace!(size, align, "heap allocation");
                Ok(Allocation::Heap(block))
            }
        }
    }

    pub fn allocate_layout(&mut self, layout: Layout) -> Result<Allocation, ArenaStackError> {
        self.allocate(layout.size(), layout.align())
    }
}
