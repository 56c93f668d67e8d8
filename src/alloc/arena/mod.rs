//! A single fixed-capacity bump arena.
//!
//! The buffer is requested from the global allocator in one piece when the
//! arena is created and handed back in one piece when it is dropped. Nothing
//! in between is tracked per allocation.

use core::cell::Cell;
use core::ptr::NonNull;

use rust_alloc::alloc::{Layout, alloc, dealloc};

use super::{ArenaId, ArenaRegion};
use crate::error::ArenaStackError;


#[derive(Debug)]
pub(crate) struct Arena {
    id: ArenaId,
    layout: Layout,
    // next free byte, always <= layout.size()
    cursor: Cell<usize>,
    buffer: NonNull<u8>,
}

impl Arena {
    pub(crate) fn try_init(
        id: ArenaId,
        capacity: usize,
        buffer_align: usize,
    ) -> Result<Self, ArenaStackError> {
        let failure = ArenaStackError::AllocationFailure {
            size: capacity,
            align: buffer_align,
        };
        let layout = Layout::from_size_align(capacity, buffer_align).map_err(|_| failure.clone())?;
        debug_assert!(layout.size() > 0, "zero capacity is rejected by the stack");

        // SAFETY: layout has a non-zero size.
        let buffer = NonNull::new(unsafe { alloc(layout) }).ok_or(failure)?;

        Ok(Self {
            id,
            layout,
            cursor: Cell::new(0),
            buffer,
        })
    }

    pub(crate) fn id(&self) -> ArenaId {
        self.id
    }

    pub(crate) fn capacity(&self) -> usize {
        self.layout.size()
    }

    pub(crate) fn offset(&self) -> usize {
        self.cursor.get()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.capacity() - self.offset()
    }

    /// Address the next allocation would start at, before alignment.
    pub(crate) fn next_ptr(&self) -> NonNull<u8> {
        // SAFETY: cursor <= capacity, so this is at most one past the end.
        unsafe { self.buffer.add(self.cursor.get()) }
    }

    pub(crate) fn contains(&self, ptr: NonNull<u8>) -> bool {
        let start = self.buffer.as_ptr() as usize;
        let addr = ptr.as_ptr() as usize;
        addr >= start && addr < start + self.capacity()
    }

    /// Bump-allocate `size` bytes aligned to `align`.
    ///
    /// `align` must be a power of two. On failure the cursor is left where
    /// it was.
    pub(crate) fn try_alloc_bytes(
        &self,
        size: usize,
        align: usize,
        zeroed: bool,
    ) -> Result<ArenaRegion, ArenaStackError> {
        debug_assert!(align.is_power_of_two());

        let offset = self.cursor.get();
        let capacity = self.capacity();
        let exhausted = ArenaStackError::ArenaExhausted {
            requested: size,
            offset,
            capacity,
        };

        // round the address, not the offset, so alignments above the
        // buffer's own alignment still land on aligned addresses
        let current = self.next_ptr().as_ptr() as usize;
        let padding = align_up(current, align)
            .map(|addr| addr - current)
            .ok_or(exhausted.clone())?;
        let aligned = offset.checked_add(padding).ok_or(exhausted.clone())?;
        let end = aligned
            .checked_add(size)
            .filter(|&end| end <= capacity)
            .ok_or(exhausted)?;

        self.cursor.set(end);

        // SAFETY: aligned + size <= capacity.
        let ptr = unsafe { self.buffer.add(aligned) };
        if zeroed {
            // SAFETY: the region lies inside the buffer and is not handed
            // out to anyone else.
            unsafe { ptr.write_bytes(0, size) };
        }

        Ok(ArenaRegion::new(self.id, aligned, ptr, size))
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        // SAFETY: allocated in `try_init` with this exact layout.
        unsafe { dealloc(self.buffer.as_ptr(), self.layout) };
    }
}

fn align_up(addr: usize, align: usize) -> Option<usize> {
    let mask = align - 1;
    addr.checked_add(mask).map(|v| v & !mask)
}
