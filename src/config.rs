//! Stack configuration.

use crate::error::ArenaStackError;

/// Configuration for an [`ArenaStack`](crate::ArenaStack).
///
/// Fixed once the stack is built. Use the `with_*` methods to adjust the
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStackConfig {
    /// Largest capacity `push_arena` accepts, in bytes.
    pub max_capacity: usize,
    /// Number of distinct arena ids. Bounds how many arenas can be live at
    /// once.
    pub max_arenas: u32,
    /// Alignment of every arena backing buffer. Requests with a larger
    /// alignment are still served; the padding comes out of the arena.
    pub buffer_align: usize,
    /// Zero every allocation before handing it out.
    pub zero_fill: bool,
}

impl ArenaStackConfig {
    /// Default maximum arena capacity: 1 GiB.
    pub const DEFAULT_MAX_CAPACITY: usize = 1 << 30;

    /// Default size of the arena id space.
    pub const DEFAULT_MAX_ARENAS: u32 = 1024;

    /// Default buffer alignment: one page.
    pub const DEFAULT_BUFFER_ALIGN: usize = 4096;

    /// Set the largest capacity `push_arena` accepts.
    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Set the size of the arena id space.
    pub fn with_max_arenas(mut self, max_arenas: u32) -> Self {
        self.max_arenas = max_arenas;
        self
    }

    /// Set the alignment of arena backing buffers.
    pub fn with_buffer_align(mut self, buffer_align: usize) -> Self {
        self.buffer_align = buffer_align;
        self
    }

    /// Choose whether allocations are zeroed.
    pub fn with_zero_fill(mut self, zero_fill: bool) -> Self {
        self.zero_fill = zero_fill;
        self
    }

    /// Check that the values can back a working stack.
    pub fn validate(&self) -> Result<(), ArenaStackError> {
        if !self.buffer_align.is_power_of_two() {
            return Err(ArenaStackError::InvalidConfig {
                reason: "buffer_align must be a power of two",
            });
        }
        if self.max_arenas == 0 {
            return Err(ArenaStackError::InvalidConfig {
                reason: "max_arenas must be at least 1",
            });
        }
        if self.max_capacity == 0 {
            return Err(ArenaStackError::InvalidConfig {
                reason: "max_capacity must be at least 1",
            });
        }
        Ok(())
    }
}

impl Default for ArenaStackConfig {
    fn default() -> Self {
        Self {
            max_capacity: Self::DEFAULT_MAX_CAPACITY,
            max_arenas: Self::DEFAULT_MAX_ARENAS,
            buffer_align: Self::DEFAULT_BUFFER_ALIGN,
            zero_fill: true,
        }
    }
}
