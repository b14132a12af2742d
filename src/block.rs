//! One device-memory object and the sub-allocator managing its occupancy.

use std::ptr::NonNull;

use crate::device::{DedicatedAllocationHint, DeviceMemory, MemoryDevice, MemoryDeviceError};
use crate::error::{AllocationError, AllocationResult};
use crate::suballocator::dedicated::DedicatedBlockAllocator;
use crate::suballocator::free_list::FreeListAllocator;
use crate::suballocator::SubAllocator;

/// A single `vkAllocateMemory`-style allocation plus whichever sub-allocator
/// is managing its occupancy. Dedicated blocks host exactly one resource;
/// general blocks host many via a [`FreeListAllocator`].
#[derive(Debug)]
pub struct MemoryBlock {
    pub(crate) device_memory: DeviceMemory,
    pub(crate) size: u64,
    pub(crate) mapped_ptr: Option<NonNull<u8>>,
    pub(crate) sub_allocator: Box<dyn SubAllocator>,
    pub(crate) dedicated: bool,
}

impl MemoryBlock {
    pub(crate) fn new(device: &dyn MemoryDevice, size: u64, memory_type_index: u32, mappable: bool, hint: DedicatedAllocationHint, dedicated: bool) -> AllocationResult<Self> {
        let device_memory = device.allocate_memory(size, memory_type_index, hint).map_err(map_device_error)?;

        let mapped_ptr = if mappable {
            match device.map_memory(device_memory) {
                Ok(ptr) => Some(ptr),
                Err(err) => {
                    device.free_memory(device_memory);
                    return Err(AllocationError::FailedToMap(err.to_string()));
                }
            }
        } else {
            None
        };

        let sub_allocator: Box<dyn SubAllocator> = if dedicated {
            Box::new(DedicatedBlockAllocator::new(size))
        } else {
            Box::new(FreeListAllocator::new(size))
        };

        Ok(Self {
            device_memory,
            size,
            mapped_ptr,
            sub_allocator,
            dedicated,
        })
    }

    pub(crate) fn destroy(self, device: &dyn MemoryDevice) {
        if self.mapped_ptr.is_some() {
            device.unmap_memory(self.device_memory);
        }
        device.free_memory(self.device_memory);
    }
}

fn map_device_error(err: MemoryDeviceError) -> AllocationError {
    match err {
        MemoryDeviceError::OutOfDeviceMemory => AllocationError::OutOfMemory,
        MemoryDeviceError::MapFailed => AllocationError::FailedToMap(err.to_string()),
        MemoryDeviceError::Other(message) => AllocationError::Internal(message),
    }
}
