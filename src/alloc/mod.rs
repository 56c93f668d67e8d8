//! Backing allocations: bump arenas, heap blocks and the values handed out
//! for them.

use core::fmt;
use core::ptr::NonNull;

mod arena;
mod heap;

pub(crate) use arena::Arena;
pub use heap::HeapBlock;

/// Identifier of a live arena within one [`ArenaStack`](crate::ArenaStack).
///
/// Ids are unique among the arenas a stack currently holds. A released id
/// is handed out again only after the rest of the id space has been cycled
/// through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(pub(crate) u32);

impl ArenaId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arena#{}", self.0)
    }
}

/// A region carved out of an arena buffer.
///
/// This is a raw view: it does not keep the arena alive. It is valid until
/// the context that owns the arena is popped or the stack is reset, and
/// using it afterwards is undefined behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaRegion {
    arena: ArenaId,
    offset: usize,
    ptr: NonNull<u8>,
    len: usize,
}

impl ArenaRegion {
    pub(crate) fn new(arena: ArenaId, offset: usize, ptr: NonNull<u8>, len: usize) -> Self {
        Self {
            arena,
            offset,
            ptr,
            len,
        }
    }

    /// The arena this region was carved from.
    pub fn arena_id(&self) -> ArenaId {
        self.arena
    }

    /// Byte offset of the region from the start of the arena buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    pub fn as_slice_ptr(&self) -> NonNull<[u8]> {
        NonNull::slice_from_raw_parts(self.ptr, self.len)
    }

    /// Borrow the region as bytes.
    ///
    /// # Safety
    ///
    /// - The owning arena context must not have been popped or reset.
    /// - The bytes must be initialized (always true with `zero_fill`).
    /// - No mutable reference to the region may exist for `'a`.
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Borrow the region as mutable bytes.
    ///
    /// # Safety
    ///
    /// Same as [`ArenaRegion::as_slice`], and no other reference to the
    /// region may exist for `'a`.
    pub unsafe fn as_mut_slice<'a>(&self) -> &'a mut [u8] {
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

/// The result of [`ArenaStack::allocate`](crate::ArenaStack::allocate).
#[derive(Debug)]
pub enum Allocation {
    /// Served by the top arena; released in bulk when that arena is popped.
    Arena(ArenaRegion),
    /// Served by the global heap; owned by the caller.
    Heap(HeapBlock),
}

impl Allocation {
    pub fn as_non_null(&self) -> NonNull<u8> {
        match self {
            Self::Arena(region) => region.as_non_null(),
            Self::Heap(block) => block.as_non_null(),
        }
    }

    pub fn as_slice_ptr(&self) -> NonNull<[u8]> {
        NonNull::slice_from_raw_parts(self.as_non_null(), self.len())
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Arena(region) => region.len(),
            Self::Heap(block) => block.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_arena(&self) -> bool {
        matches!(self, Self::Arena(_))
    }

    /// Offset within the arena buffer, or `None` for heap allocations.
    pub fn arena_offset(&self) -> Option<usize> {
        match self {
            Self::Arena(region) => Some(region.offset()),
            Self::Heap(_) => None,
        }
    }

    pub fn arena_id(&self) -> Option<ArenaId> {
        match self {
            Self::Arena(region) => Some(region.arena_id()),
            Self::Heap(_) => None,
        }
    }

    pub fn into_heap(self) -> Option<HeapBlock> {
        match self {
            Self::Heap(block) => Some(block),
            Self::Arena(_) => None,
        }
    }
}
