//! A stack of allocation contexts.
//!
//! Each context on an [`ArenaStack`] is either a fixed-capacity bump arena or
//! a pass-through to the global heap. Allocations are served by whichever
//! context is on top; popping an arena context releases its whole buffer at
//! once. The bottom of the stack is always a heap context, so allocation is
//! possible even when no arena has been pushed.
//!
//! ```
//! use arena_stack::{Allocation, ArenaStack};
//!
//! let mut stack = ArenaStack::new();
//! stack.push_arena(64).unwrap();
//!
//! let first = stack.allocate(10, 8).unwrap();
//! let second = stack.allocate(10, 8).unwrap();
//! assert_eq!(first.arena_offset(), Some(0));
//! assert_eq!(second.arena_offset(), Some(16));
//!
//! stack.pop().unwrap();
//! assert!(matches!(stack.allocate(4, 4).unwrap(), Allocation::Heap(_)));
//! assert!(stack.pop().is_err());
//! ```

#![no_std]

extern crate alloc as rust_alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod alloc;
pub mod config;
pub mod error;
pub mod stack;

#[cfg(feature = "allocator-api")]
pub mod allocator;

pub use crate::alloc::{Allocation, ArenaId, ArenaRegion, HeapBlock};
pub use crate::config::ArenaStackConfig;
pub use crate::error::ArenaStackError;
pub use crate::stack::{ArenaScope, ArenaStack, ContextKind};

#[cfg(feature = "allocator-api")]
pub use crate::allocator::StackAllocator;
