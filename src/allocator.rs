//! The public entry point: memory-type selection, dispatch and teardown.

use std::ops::Range;
use std::sync::Arc;

use crate::allocation::Allocation;
use crate::device::{MemoryDevice, MemoryPropertyFlags};
use crate::error::{AllocationError, AllocationResult};
use crate::location::{AllocationScheme, MemoryLocation};
use crate::log::LogLevel;
use crate::memory_type::{MemoryType, Request};
use crate::sizes::AllocationSizes;

/// The size and type-compatibility requirements of a requested resource, as
/// a driver would report them for a buffer or image.
#[derive(Debug, Clone, Copy)]
pub struct MemoryRequirements {
    pub size: u64,
    pub alignment: u64,
    /// Bit `i` set means memory type `i` is compatible with this resource.
    pub memory_type_bits: u32,
}

/// One allocation request.
#[derive(Debug, Clone, Copy)]
pub struct AllocationCreateDesc<'a> {
    pub name: &'a str,
    pub requirements: MemoryRequirements,
    pub location: MemoryLocation,
    pub linear: bool,
    pub scheme: AllocationScheme,
}

/// Independently-toggled debug log classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorDebugSettings {
    pub log_memory_information: bool,
    pub log_leaks_on_shutdown: bool,
    pub log_allocations: bool,
    pub log_frees: bool,
}

impl AllocatorDebugSettings {
    /// Only surfaces leaks at teardown; silent otherwise.
    #[must_use]
    pub fn production() -> Self {
        Self {
            log_memory_information: false,
            log_leaks_on_shutdown: true,
            log_allocations: false,
            log_frees: false,
        }
    }

    /// Logs every block transition, allocation and free.
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            log_memory_information: true,
            log_leaks_on_shutdown: true,
            log_allocations: true,
            log_frees: true,
        }
    }
}

impl Default for AllocatorDebugSettings {
    fn default() -> Self {
        Self::production()
    }
}

/// Configuration for [`Allocator::new`].
pub struct AllocatorCreateDesc {
    pub device: Arc<dyn MemoryDevice>,
    pub device_address: bool,
    pub debug_settings: AllocatorDebugSettings,
    pub allocation_sizes: AllocationSizes,
}

/// One allocation as surfaced by [`Allocator::report`].
#[derive(Debug, Clone)]
pub struct AllocationReportEntry {
    pub name: Option<String>,
    pub offset: u64,
    pub size: u64,
}

/// One block as surfaced by [`Allocator::report`], with the half-open range
/// of `AllocatorReport::allocations` it owns.
#[derive(Debug, Clone)]
pub struct MemoryBlockReport {
    pub memory_type_index: u32,
    pub size: u64,
    pub allocations: Range<usize>,
}

/// A point-in-time snapshot of every block and live allocation.
#[derive(Debug, Clone)]
pub struct AllocatorReport {
    pub allocations: Vec<AllocationReportEntry>,
    pub blocks: Vec<MemoryBlockReport>,
    pub total_allocated_bytes: u64,
    pub total_reserved_bytes: u64,
}

/// Selects a memory type, dispatches to it, and owns every block this
/// process has opened. Not `Send`/`Sync`: see the crate's concurrency
/// notes in [`crate`].
pub struct Allocator {
    device: Arc<dyn MemoryDevice>,
    memory_types: Vec<MemoryType>,
    buffer_image_granularity: u64,
    device_address: bool,
    debug_settings: AllocatorDebugSettings,
}

impl Allocator {
    pub fn new(desc: AllocatorCreateDesc) -> AllocationResult<Self> {
        let properties = desc.device.memory_properties();
        if properties.memory_types.is_empty() {
            return Err(AllocationError::InvalidAllocatorCreateDesc("device reports no memory types".into()));
        }

        let memory_types = properties
            .memory_types
            .iter()
            .enumerate()
            .map(|(index, info)| {
                let mappable = info.property_flags.contains(MemoryPropertyFlags::HOST_VISIBLE);
                let block_size = if mappable {
                    desc.allocation_sizes.host_memblock_size()
                } else {
                    desc.allocation_sizes.device_memblock_size()
                };
                MemoryType::new(index as u32, info.property_flags, info.heap_index, mappable, block_size, desc.debug_settings.log_memory_information)
            })
            .collect::<Vec<_>>();

        let buffer_image_granularity = desc.device.buffer_image_granularity();

        if desc.debug_settings.log_memory_information {
            #[cfg(feature = "logging")]
            tracing::info!(memory_type_count = memory_types.len(), buffer_image_granularity, "allocator initialized");
        }

        Ok(Self {
            device: desc.device,
            memory_types,
            buffer_image_granularity,
            device_address: desc.device_address,
            debug_settings: desc.debug_settings,
        })
    }

    pub fn allocate(&mut self, desc: &AllocationCreateDesc<'_>) -> AllocationResult<Allocation> {
        if desc.requirements.size == 0 || !desc.requirements.alignment.is_power_of_two() {
            return Err(AllocationError::InvalidAllocationCreateDesc);
        }

        let memory_type_index = self.find_memory_type_index(desc.location, desc.requirements.memory_type_bits)?;
        self.check_heap_capacity(memory_type_index, desc.requirements.size)?;

        let name = if desc.name.is_empty() { None } else { Some(desc.name.to_string()) };
        let request = Request {
            size: desc.requirements.size,
            alignment: desc.requirements.alignment,
            linear: desc.linear,
            scheme: desc.scheme,
            name,
        };

        let primary = self.memory_types[memory_type_index].allocate(self.device.as_ref(), request.clone(), self.buffer_image_granularity, self.device_address);

        let result = match primary {
            Err(AllocationError::OutOfMemory) if desc.location == MemoryLocation::CpuToGpu => {
                let fallback_flags = MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT;
                let fallback_index = self.scan_memory_types(fallback_flags, desc.requirements.memory_type_bits).ok_or(AllocationError::NoCompatibleMemoryTypeFound)?;
                self.memory_types[fallback_index].allocate(self.device.as_ref(), request, self.buffer_image_granularity, self.device_address)
            }
            other => other,
        };

        let allocation = result?;

        if self.debug_settings.log_allocations {
            #[cfg(feature = "logging")]
            tracing::debug!(
                memory_type_index = allocation.memory_type_index(),
                offset = allocation.offset(),
                size = allocation.size(),
                name = allocation.name().unwrap_or("<unnamed>"),
                "allocated"
            );
        }

        Ok(allocation)
    }

    pub fn free(&mut self, allocation: Allocation) -> AllocationResult<()> {
        if allocation.chunk_id.is_none() {
            return Ok(());
        }

        if self.debug_settings.log_frees {
            #[cfg(feature = "logging")]
            tracing::debug!(memory_type_index = allocation.memory_type_index(), offset = allocation.offset(), size = allocation.size(), "freed");
        }

        let memory_type_index = allocation.memory_type_index as usize;
        self.memory_types[memory_type_index].free(self.device.as_ref(), &allocation)
    }

    pub fn rename(&mut self, allocation: &mut Allocation, name: &str) -> AllocationResult<()> {
        if let Some(chunk_id) = allocation.chunk_id {
            let memory_type_index = allocation.memory_type_index as usize;
            self.memory_types[memory_type_index].rename(chunk_id, allocation.block_index, Some(name.to_string()))?;
        }
        allocation.name = Some(name.to_string());
        Ok(())
    }

    #[must_use]
    pub fn report(&self) -> AllocatorReport {
        let mut allocations = Vec::new();
        let mut blocks = Vec::new();
        let mut total_reserved_bytes = 0;

        for memory_type in &self.memory_types {
            for (_, block) in memory_type.blocks() {
                let start = allocations.len();
                for entry in block.sub_allocator.report_allocations() {
                    allocations.push(AllocationReportEntry {
                        name: entry.name,
                        offset: entry.offset,
                        size: entry.size,
                    });
                }
                blocks.push(MemoryBlockReport {
                    memory_type_index: memory_type.memory_type_index(),
                    size: block.size,
                    allocations: start..allocations.len(),
                });
                total_reserved_bytes += block.size;
            }
        }

        let total_allocated_bytes = allocations.iter().map(|entry| entry.size).sum();

        AllocatorReport {
            allocations,
            blocks,
            total_allocated_bytes,
            total_reserved_bytes,
        }
    }

    /// Total bytes reserved from the device across every open block.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.memory_types.iter().flat_map(MemoryType::blocks).map(|(_, block)| block.size).sum()
    }

    pub fn report_leaks(&self, level: LogLevel) {
        for memory_type in &self.memory_types {
            for (block_index, block) in memory_type.blocks() {
                block.sub_allocator.report_leaks(level, memory_type.memory_type_index() as usize, block_index);
            }
        }
    }

    /// Releases every open block back to the device. Consumes `self`: the
    /// allocator cannot be used afterward.
    pub fn dispose(mut self) {
        if self.debug_settings.log_leaks_on_shutdown {
            self.report_leaks(LogLevel::Warn);
        }
        for memory_type in &mut self.memory_types {
            memory_type.dispose(self.device.as_ref());
        }
    }

    fn find_memory_type_index(&self, location: MemoryLocation, type_bits: u32) -> AllocationResult<usize> {
        let (preferred, required) = placement_preference(location);
        if let Some(index) = self.scan_memory_types(preferred, type_bits) {
            return Ok(index);
        }
        if let Some(required) = required {
            if let Some(index) = self.scan_memory_types(required, type_bits) {
                return Ok(index);
            }
        }
        Err(AllocationError::NoCompatibleMemoryTypeFound)
    }

    fn scan_memory_types(&self, flags: MemoryPropertyFlags, type_bits: u32) -> Option<usize> {
        self.memory_types.iter().position(|memory_type| {
            let bit_set = (type_bits >> memory_type.memory_type_index()) & 1 != 0;
            bit_set && memory_type.property_flags().contains(flags)
        })
    }

    fn check_heap_capacity(&self, memory_type_index: usize, size: u64) -> AllocationResult<()> {
        let heap_index = self.memory_types[memory_type_index].heap_index() as usize;
        let heap_size = self
            .device
            .memory_properties()
            .memory_heaps
            .get(heap_index)
            .ok_or_else(|| AllocationError::Internal("memory type references an out-of-range heap".into()))?
            .size;
        if size > heap_size {
            return Err(AllocationError::OutOfMemory);
        }
        Ok(())
    }
}

fn placement_preference(location: MemoryLocation) -> (MemoryPropertyFlags, Option<MemoryPropertyFlags>) {
    use MemoryPropertyFlags as F;
    match location {
        MemoryLocation::Unknown => (F::empty(), None),
        MemoryLocation::GpuOnly => (F::DEVICE_LOCAL, Some(F::DEVICE_LOCAL)),
        MemoryLocation::CpuToGpu => (F::HOST_VISIBLE | F::HOST_COHERENT | F::DEVICE_LOCAL, Some(F::HOST_VISIBLE | F::HOST_COHERENT)),
        MemoryLocation::GpuToCpu => (F::HOST_VISIBLE | F::HOST_COHERENT | F::HOST_CACHED, Some(F::HOST_VISIBLE | F::HOST_COHERENT)),
    }
}
