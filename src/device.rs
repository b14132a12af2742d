//! The boundary between this crate and a real graphics/compute driver.
//!
//! Production code implements [`MemoryDevice`] once per backend (Vulkan,
//! D3D12, ...); tests plug in an in-memory stand-in.

use std::ptr::NonNull;

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Mirrors a driver's per-memory-type property bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryPropertyFlags: u32 {
        const DEVICE_LOCAL     = 1 << 0;
        const HOST_VISIBLE     = 1 << 1;
        const HOST_COHERENT    = 1 << 2;
        const HOST_CACHED      = 1 << 3;
        const LAZILY_ALLOCATED = 1 << 4;
        const PROTECTED        = 1 << 5;
    }
}

/// One heap a device draws memory types from.
#[derive(Debug, Clone, Copy)]
pub struct MemoryHeap {
    pub size: u64,
}

/// One memory type: a set of property flags backed by a heap.
#[derive(Debug, Clone, Copy)]
pub struct MemoryTypeInfo {
    pub property_flags: MemoryPropertyFlags,
    pub heap_index: u32,
}

/// The device's full memory topology, queried once at `Allocator`
/// construction.
#[derive(Debug, Clone)]
pub struct MemoryProperties {
    pub memory_types: Vec<MemoryTypeInfo>,
    pub memory_heaps: Vec<MemoryHeap>,
}

/// An opaque driver handle to one device-memory object. Ownership is
/// tracked by the owning [`crate::block::MemoryBlock`], not by the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceMemory(pub u64);

/// Hints passed through to the driver so it can bind a dedicated allocation
/// directly to the resource it backs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DedicatedAllocationHint {
    pub dedicated_buffer: bool,
    pub dedicated_image: bool,
    pub device_address: bool,
}

/// Failures surfaced by the driver collaborator itself, distinct from this
/// crate's own [`crate::error::AllocationError`].
#[derive(Debug, Error)]
pub enum MemoryDeviceError {
    #[error("device failed to allocate memory")]
    OutOfDeviceMemory,
    #[error("device failed to map memory")]
    MapFailed,
    #[error("driver error: {0}")]
    Other(String),
}

/// The graphics/compute driver collaborator.
///
/// Implementations must be internally synchronized if shared across
/// threads; this crate calls them from behind `&self` only (allocation
/// bookkeeping lives entirely in [`crate::Allocator`]).
pub trait MemoryDevice {
    fn memory_properties(&self) -> &MemoryProperties;

    /// The buffer-image granularity: adjacent linear and non-linear
    /// resources placed within this many bytes of each other may alias the
    /// same physical page.
    fn buffer_image_granularity(&self) -> u64;

    fn allocate_memory(&self, size: u64, memory_type_index: u32, dedicated: DedicatedAllocationHint) -> Result<DeviceMemory, MemoryDeviceError>;

    fn free_memory(&self, memory: DeviceMemory);

    /// # Safety
    /// The returned pointer is valid for `size` bytes until the matching
    /// `unmap_memory` call, where `size` is the size of the memory object
    /// backing `memory`, not any single sub-allocation within it.
    fn map_memory(&self, memory: DeviceMemory) -> Result<NonNull<u8>, MemoryDeviceError>;

    fn unmap_memory(&self, memory: DeviceMemory);
}
