//! Caller-owned blocks from the global allocator.

use core::mem::{ManuallyDrop, MaybeUninit};
use core::ptr::NonNull;

use rust_alloc::alloc::{Layout, alloc, alloc_zeroed, dealloc};

use crate::error::ArenaStackError;

/// A block allocated while a heap context was on top of the stack.
///
/// The stack keeps no record of it. Dropping the block frees it; use
/// [`HeapBlock::into_raw`] to take over freeing manually.
#[derive(Debug)]
pub struct HeapBlock {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl HeapBlock {
    pub(crate) fn try_alloc(layout: Layout, zeroed: bool) -> Result<Self, ArenaStackError> {
        let failure = ArenaStackError::AllocationFailure {
            size: layout.size(),
            align: layout.align(),
        };

        // zero-sized requests never touch the allocator
        if layout.size() == 0 {
            let dangling = core::ptr::without_provenance_mut::<u8>(layout.align());
            let ptr = NonNull::new(dangling).ok_or(failure)?;
            return Ok(Self { ptr, layout });
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe {
            if zeroed {
                alloc_zeroed(layout)
            } else {
                alloc(layout)
            }
        };
        let ptr = NonNull::new(raw).ok_or(failure)?;
        Ok(Self { ptr, layout })
    }

    /// Rebuild a block from the parts returned by [`HeapBlock::into_raw`].
    ///
    /// # Safety
    ///
    /// `ptr` and `layout` must come from a single `into_raw` call, and the
    /// block must not have been freed or rebuilt since.
    pub unsafe fn from_raw(ptr: NonNull<u8>, layout: Layout) -> Self {
        Self { ptr, layout }
    }

    /// Give up ownership without freeing. The caller must later free the
    /// memory with the global allocator and the returned layout, or hand
    /// both back to [`HeapBlock::from_raw`].
    pub fn into_raw(self) -> (NonNull<u8>, Layout) {
        let this = ManuallyDrop::new(self);
        (this.ptr, this.layout)
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    pub fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// View the block as possibly uninitialized bytes.
    pub fn as_uninit_mut(&mut self) -> &mut [MaybeUninit<u8>] {
        // SAFETY: the block owns `len` bytes at `ptr`; MaybeUninit needs no
        // initialization.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr().cast(), self.len()) }
    }

    /// # Safety
    ///
    /// Every byte must be initialized (always true for blocks allocated with
    /// `zero_fill`).
    pub unsafe fn as_slice(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }

    /// # Safety
    ///
    /// Every byte must be initialized (always true for blocks allocated with
    /// `zero_fill`).
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len()) }
    }
}

impl Drop for HeapBlock {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // SAFETY: allocated in `try_alloc` with this exact layout.
            unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
        }
    }
}
