//! Scoped acquisition of stack contexts.

use core::ops::{Deref, DerefMut};

use super::ArenaStack;
use crate::alloc::ArenaId;
use crate::error::ArenaStackError;

/// Guard returned by [`ArenaStack::enter_arena`] and
/// [`ArenaStack::enter_heap`].
///
/// Dereferences to the stack. When dropped it pops back to the depth the
/// stack had before the guard's context was pushed, including any contexts
/// pushed through the guard and left behind. This runs on early returns and
/// during unwinding as well.
#[must_use = "the context is popped as soon as the scope is dropped"]
pub struct ArenaScope<'s> {
    stack: &'s mut ArenaStack,
    depth: usize,
    arena: Option<ArenaId>,
}

impl ArenaScope<'_> {
    /// Id of the arena this scope pushed, `None` for heap scopes.
    pub fn arena_id(&self) -> Option<ArenaId> {
        self.arena
    }
}

impl Deref for ArenaScope<'_> {
    type Target = ArenaStack;

    fn deref(&self) -> &Self::Target {
        self.stack
    }
}

impl DerefMut for ArenaScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.stack
    }
}

impl Drop for ArenaScope<'_> {
    fn drop(&mut self) {
        self.stack.unwind_to(self.depth);
    }
}

impl ArenaStack {
    /// Push an arena of `capacity` bytes for as long as the returned guard
    /// lives.
    pub fn enter_arena(&mut self, capacity: usize) -> Result<ArenaScope<'_>, ArenaStackError> {
        let depth = self.depth();
        let id = self.push_arena(capacity)?;
        Ok(ArenaScope {
            stack: self,
            depth,
            arena: Some(id),
        })
    }

    /// Push a heap context for as long as the returned guard lives.
    pub fn enter_heap(&mut self) -> ArenaScope<'_> {
        let depth = self.depth();
        self.push_heap();
        ArenaScope {
            stack: self,
            depth,
            arena: None,
        }
    }

    /// Run `f` with a fresh arena of `capacity` bytes on top, popping it
    /// afterwards whatever `f` returns.
    pub fn with_arena<R>(
        &mut self,
        capacity: usize,
        f: impl FnOnce(&mut ArenaStack) -> R,
    ) -> Result<R, ArenaStackError> {
        let mut scope = self.enter_arena(capacity)?;
        Ok(f(&mut scope))
    }
}
