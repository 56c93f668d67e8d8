//! [`Allocator`] handle over a shared [`ArenaStack`].

use core::cell::RefCell;
use core::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator};
use rust_alloc::alloc::Layout;
use tracing::{debug, warn};

use crate::alloc::{Allocation, HeapBlock};
use crate::stack::ArenaStack;

/// Wraps a `&RefCell<ArenaStack>` so collections can allocate from whatever
/// context is on top of the stack.
///
/// Deallocating memory that came from an arena is a no-op; the arena is
/// reclaimed as a whole when its context is popped. Heap memory is freed
/// normally.
#[derive(Clone, Copy)]
pub struct StackAllocator<'s> {
    stack: &'s RefCell<ArenaStack>,
}

impl<'s> StackAllocator<'s> {
    /// # Safety
    ///
    /// Every allocation made through this handle while an arena context is
    /// on top must be deallocated (or leaked) before that context is popped
    /// or the stack is reset. Once the arena is gone the handle can no
    /// longer tell its pointers from heap pointers.
    pub unsafe fn new(stack: &'s RefCell<ArenaStack>) -> Self {
        Self { stack }
    }
}

unsafe impl Allocator for StackAllocator<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let mut stack = self.stack.try_borrow_mut().map_err(|_| AllocError)?;

        match stack.allocate_layout(layout) {
            Ok(Allocation::Arena(region)) => Ok(region.as_slice_ptr()),
            Ok(Allocation::Heap(block)) => {
                let (ptr, layout) = block.into_raw();
                Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
            }
            Err(err) => {
                debug!(%err, "stack allocator request failed");
                Err(AllocError)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // leak rather than guess while the stack is mutably borrowed
        let Ok(stack) = self.stack.try_borrow() else {
            warn!(
                ptr = ?ptr,
                size = layout.size(),
                "stack borrowed during deallocate, leaking block"
            );
            return;
        };
        if stack.owns(ptr) {
            return;
        }
        // SAFETY: not an arena pointer, so it was produced by
        // `HeapBlock::into_raw` in `allocate` with this layout.
        drop(unsafe { HeapBlock::from_raw(ptr, layout) });
    }
}
