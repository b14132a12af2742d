//! The caller-facing handle to one placed sub-region.

use std::ptr::NonNull;
use std::slice;

use crate::chunk::ChunkId;
use crate::device::{DeviceMemory, MemoryPropertyFlags};

/// A sub-region of a [`crate::block::MemoryBlock`], returned by
/// [`crate::Allocator::allocate`].
///
/// A "null" allocation (no backing chunk) is never produced by `allocate`;
/// it exists only as [`Allocation::default`], a sentinel some callers use to
/// pre-populate a field before a real allocation is made.
#[derive(Debug)]
pub struct Allocation {
    pub(crate) chunk_id: Option<ChunkId>,
    pub(crate) offset: u64,
    pub(crate) size: u64,
    pub(crate) block_index: usize,
    pub(crate) memory_type_index: u32,
    pub(crate) device_memory: DeviceMemory,
    pub(crate) mapped_ptr: Option<NonNull<u8>>,
    pub(crate) memory_properties: MemoryPropertyFlags,
    pub(crate) dedicated: bool,
    pub(crate) name: Option<String>,
}

impl Allocation {
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.chunk_id.is_none()
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn memory_type_index(&self) -> u32 {
        self.memory_type_index
    }

    #[must_use]
    pub fn device_memory(&self) -> DeviceMemory {
        self.device_memory
    }

    #[must_use]
    pub fn memory_properties(&self) -> MemoryPropertyFlags {
        self.memory_properties
    }

    /// Whether this allocation owns its block outright (dedicated buffer or
    /// image scheme), as opposed to sharing a general block.
    #[must_use]
    pub fn is_dedicated(&self) -> bool {
        self.dedicated
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The mapped pointer for this sub-region, already adjusted for its
    /// offset within the block. `None` if the owning memory type is not
    /// host-visible.
    #[must_use]
    pub fn mapped_ptr(&self) -> Option<NonNull<u8>> {
        self.mapped_ptr
    }

    /// A read-only view of the mapped sub-region, sized to this allocation.
    #[must_use]
    pub fn mapped_slice(&self) -> Option<&[u8]> {
        self.mapped_ptr.map(|ptr| unsafe { slice::from_raw_parts(ptr.as_ptr(), self.size as usize) })
    }

    /// A mutable view of the mapped sub-region, sized to this allocation.
    #[must_use]
    pub fn mapped_slice_mut(&mut self) -> Option<&mut [u8]> {
        self.mapped_ptr.map(|ptr| unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), self.size as usize) })
    }
}

impl Default for Allocation {
    fn default() -> Self {
        Self {
            chunk_id: None,
            offset: 0,
            size: 0,
            block_index: 0,
            memory_type_index: 0,
            device_memory: DeviceMemory(0),
            mapped_ptr: None,
            memory_properties: MemoryPropertyFlags::empty(),
            dedicated: false,
            name: None,
        }
    }
}
