//! An in-memory `MemoryDevice` stand-in, driving the allocator without a
//! real driver. Mirrors the minimal-fixture style of `safety_check.rs`'s
//! `Poolable` stub: just enough state to exercise the collaborator contract.

use std::cell::Cell;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use gpu_suballocator::{DedicatedAllocationHint, DeviceMemory, MemoryDevice, MemoryDeviceError, MemoryHeap, MemoryProperties, MemoryPropertyFlags, MemoryTypeInfo};

/// A backing store for one simulated `DeviceMemory` object, so mapped
/// pointers stay valid for the lifetime of the allocation.
struct Backing {
    #[allow(dead_code)]
    bytes: Box<[u8]>,
}

/// Installs a `tracing` subscriber for the current test process so the
/// allocator's debug logging is visible with `cargo test -- --nocapture`.
/// Safe to call from multiple tests; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub struct MockDevice {
    properties: MemoryProperties,
    granularity: u64,
    next_handle: AtomicU64,
    backings: Mutex<Vec<(DeviceMemory, Backing)>>,
    pub fail_next_allocate: Cell<bool>,
    pub fail_next_map: Cell<bool>,
}

impl MockDevice {
    /// Two memory types: type 0 device-local only, type 1 host-visible +
    /// host-coherent, both backed by a single heap of `heap_size` bytes.
    #[must_use]
    pub fn two_types(heap_size: u64) -> Self {
        Self {
            properties: MemoryProperties {
                memory_types: vec![
                    MemoryTypeInfo {
                        property_flags: MemoryPropertyFlags::DEVICE_LOCAL,
                        heap_index: 0,
                    },
                    MemoryTypeInfo {
                        property_flags: MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
                        heap_index: 1,
                    },
                ],
                memory_heaps: vec![MemoryHeap { size: heap_size }, MemoryHeap { size: heap_size }],
            },
            granularity: 64,
            next_handle: AtomicU64::new(1),
            backings: Mutex::new(Vec::new()),
            fail_next_allocate: Cell::new(false),
            fail_next_map: Cell::new(false),
        }
    }
}

impl MemoryDevice for MockDevice {
    fn memory_properties(&self) -> &MemoryProperties {
        &self.properties
    }

    fn buffer_image_granularity(&self) -> u64 {
        self.granularity
    }

    fn allocate_memory(&self, size: u64, _memory_type_index: u32, _dedicated: DedicatedAllocationHint) -> Result<DeviceMemory, MemoryDeviceError> {
        if self.fail_next_allocate.replace(false) {
            return Err(MemoryDeviceError::OutOfDeviceMemory);
        }
        let handle = DeviceMemory(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let backing = Backing {
            bytes: vec![0u8; size as usize].into_boxed_slice(),
        };
        self.backings.lock().unwrap().push((handle, backing));
        Ok(handle)
    }

    fn free_memory(&self, memory: DeviceMemory) {
        self.backings.lock().unwrap().retain(|(handle, _)| *handle != memory);
    }

    fn map_memory(&self, memory: DeviceMemory) -> Result<NonNull<u8>, MemoryDeviceError> {
        if self.fail_next_map.replace(false) {
            return Err(MemoryDeviceError::MapFailed);
        }
        let mut backings = self.backings.lock().unwrap();
        let (_, backing) = backings.iter_mut().find(|(handle, _)| *handle == memory).ok_or(MemoryDeviceError::Other("map: unknown handle".into()))?;
        NonNull::new(backing.bytes.as_mut_ptr()).ok_or(MemoryDeviceError::MapFailed)
    }

    fn unmap_memory(&self, _memory: DeviceMemory) {}
}

impl MockDevice {
    /// Number of device-memory objects currently live (allocated and not
    /// yet freed). Used to assert that a failed `map_memory` triggers an
    /// immediate `free_memory` rather than leaking the handle.
    #[must_use]
    pub fn live_allocation_count(&self) -> usize {
        self.backings.lock().unwrap().len()
    }
}
