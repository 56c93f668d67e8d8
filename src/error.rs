//! Errors returned by stack and arena operations.

use crate::alloc::ArenaId;

/// Errors that can occur while pushing, popping or allocating.
///
/// Every error is handed back to the caller unchanged; nothing here is
/// retried or recovered internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaStackError {
    /// The global allocator could not provide the requested memory.
    #[error("allocation of {size} bytes aligned to {align} failed")]
    AllocationFailure {
        /// Number of bytes requested.
        size: usize,
        /// Requested alignment.
        align: usize,
    },
    /// `pop` was called with only the bottom heap context left.
    #[error("cannot pop the bottom heap context")]
    EmptyStackUnderflow,
    /// The top arena has no room left for the request.
    #[error("arena exhausted: requested {requested} bytes at offset {offset}, capacity {capacity}")]
    ArenaExhausted {
        /// Number of bytes requested.
        requested: usize,
        /// Arena cursor at the time of the request.
        offset: usize,
        /// Total capacity of the arena.
        capacity: usize,
    },
    /// The requested alignment is not a power of two.
    #[error("alignment {align} is not a power of two")]
    InvalidAlignment {
        /// The rejected alignment.
        align: usize,
    },
    /// Arena capacity was zero or above the configured maximum.
    #[error("invalid arena capacity {capacity} (must be between 1 and {max})")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
        /// Configured maximum capacity.
        max: usize,
    },
    /// Every arena id is held by a live arena.
    #[error("all {max} arena ids are in use")]
    ArenaIdsExhausted {
        /// Size of the id space.
        max: u32,
    },
    /// No live arena on this stack carries the id.
    #[error("no live arena with id {id}")]
    UnknownArena {
        /// The id that was looked up.
        id: ArenaId,
    },
    /// A configuration value was rejected.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: &'static str,
    },
}
