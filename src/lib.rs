//! A sub-allocation engine for typed GPU memory heaps.
//!
//! Sits between a graphics/compute driver — which hands out a small number
//! of large device-memory objects drawn from typed heaps — and application
//! code that wants many small, aligned sub-regions for buffers and images.
//! [`Allocator`] owns a pool of blocks per memory type, grows the pool on
//! demand, promotes oversized or dedicated requests to their own block, and
//! selects a memory type from a type-bit mask plus a placement preference.
//!
//! The core free-list logic lives in [`suballocator::free_list`]: best-fit
//! placement, alignment padding, buffer-image granularity conflicts, and
//! chunk splitting/coalescing.
//!
//! # Concurrency
//!
//! Nothing in this crate is internally synchronized. [`Allocator`] does not
//! implement `Send` or `Sync`; a caller sharing allocations across threads
//! is expected to provide its own external synchronization.

pub mod allocation;
pub mod allocator;
pub mod chunk;
pub mod device;
pub mod error;
pub mod location;
pub mod log;
pub mod memory_type;
pub mod sizes;
pub mod suballocator;
pub mod util;

pub use allocation::Allocation;
pub use allocator::{Allocator, AllocatorCreateDesc, AllocatorDebugSettings, AllocatorReport, AllocationCreateDesc, AllocationReportEntry, MemoryBlockReport, MemoryRequirements};
pub use device::{DedicatedAllocationHint, DeviceMemory, MemoryDevice, MemoryDeviceError, MemoryHeap, MemoryProperties, MemoryPropertyFlags, MemoryTypeInfo};
pub use error::{AllocationError, AllocationResult};
pub use location::{AllocationScheme, MemoryLocation};
pub use log::LogLevel;
pub use memory_type::MemoryType;
pub use sizes::AllocationSizes;
