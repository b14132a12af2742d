mod support;

use std::sync::Arc;

use gpu_suballocator::{
    AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc, AllocatorDebugSettings, AllocationSizes, LogLevel, MemoryLocation, MemoryRequirements,
};
use support::MockDevice;

fn allocator(device: Arc<MockDevice>, sizes: AllocationSizes) -> Allocator {
    Allocator::new(AllocatorCreateDesc {
        device,
        device_address: false,
        debug_settings: AllocatorDebugSettings::verbose(),
        allocation_sizes: sizes,
    })
    .expect("allocator construction should succeed against a well-formed device")
}

fn small_sizes() -> AllocationSizes {
    // both normalize to the 4 MiB floor, keeping test blocks small.
    AllocationSizes::new(1, 1)
}

// Scenario A: two small managed allocations from the same memory type share
// a block.
#[test]
fn scenario_a_managed_allocations_share_a_block() {
    support::init_tracing();
    let device = Arc::new(MockDevice::two_types(64 * 1024 * 1024));
    let mut allocator = allocator(device, small_sizes());

    let requirements = MemoryRequirements { size: 1024, alignment: 256, memory_type_bits: 0b11 };

    let first = allocator
        .allocate(&AllocationCreateDesc {
            name: "a",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: true,
            scheme: AllocationScheme::Managed,
        })
        .unwrap();
    let second = allocator
        .allocate(&AllocationCreateDesc {
            name: "b",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: true,
            scheme: AllocationScheme::Managed,
        })
        .unwrap();

    assert_eq!(first.memory_type_index(), second.memory_type_index());
    let report = allocator.report();
    assert_eq!(report.blocks.len(), 1);
    assert_eq!(report.allocations.len(), 2);

    allocator.free(first).unwrap();
    allocator.free(second).unwrap();
    allocator.dispose();
}

// Scenario B: a request larger than the block size gets its own block but
// is not marked dedicated.
#[test]
fn scenario_b_oversized_managed_request_gets_its_own_block_but_is_not_dedicated() {
    let device = Arc::new(MockDevice::two_types(512 * 1024 * 1024));
    let mut allocator = allocator(device, small_sizes());

    let requirements = MemoryRequirements {
        size: 8 * 1024 * 1024, // bigger than the 4 MiB general block size
        alignment: 256,
        memory_type_bits: 0b11,
    };
    let allocation = allocator
        .allocate(&AllocationCreateDesc {
            name: "oversized",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: true,
            scheme: AllocationScheme::Managed,
        })
        .unwrap();

    assert!(!allocation.is_dedicated());
    allocator.free(allocation).unwrap();
    allocator.dispose();
}

// Scenario C: a dedicated-buffer scheme always gets its own block, even
// when it would have fit in a shared one.
#[test]
fn scenario_c_dedicated_scheme_gets_its_own_block() {
    let device = Arc::new(MockDevice::two_types(64 * 1024 * 1024));
    let mut allocator = allocator(device, small_sizes());

    let requirements = MemoryRequirements { size: 1024, alignment: 256, memory_type_bits: 0b11 };
    let allocation = allocator
        .allocate(&AllocationCreateDesc {
            name: "dedicated",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: true,
            scheme: AllocationScheme::DedicatedBuffer(42),
        })
        .unwrap();

    assert!(allocation.is_dedicated());
    allocator.free(allocation).unwrap();
    allocator.dispose();
}

// Scenario D: CpuToGpu's preferred tier requires device-local *and*
// host-visible; when only a plain host-visible+host-coherent type is
// compatible, the required-tier fallback in type selection picks it.
#[test]
fn scenario_d_cpu_to_gpu_falls_back_when_the_preferred_tier_is_incompatible() {
    let device = Arc::new(MockDevice::two_types(64 * 1024 * 1024));
    let mut allocator = allocator(device, small_sizes());

    // type bit 1 only (host-visible type), excluding the device-local type
    // that the preferred CpuToGpu tier would otherwise select.
    let requirements = MemoryRequirements { size: 1024, alignment: 256, memory_type_bits: 0b10 };
    let allocation = allocator
        .allocate(&AllocationCreateDesc {
            name: "upload",
            requirements,
            location: MemoryLocation::CpuToGpu,
            linear: true,
            scheme: AllocationScheme::Managed,
        })
        .unwrap();

    assert_eq!(allocation.memory_type_index(), 1);
    assert!(allocation.mapped_slice().is_some());
    allocator.free(allocation).unwrap();
    allocator.dispose();
}

// Scenario E: an emptied general block is reclaimed only while a sibling
// general block remains; the last general block in a memory type is kept
// resident (empty but present) rather than torn down.
#[test]
fn scenario_e_last_general_block_is_kept_resident() {
    let device = Arc::new(MockDevice::two_types(64 * 1024 * 1024));
    let mut allocator = allocator(device, small_sizes());

    let block_size = small_sizes().device_memblock_size();
    let requirements = MemoryRequirements {
        size: block_size, // exactly one block's worth, forces a second block open
        alignment: 256,
        memory_type_bits: 0b11,
    };

    let first = allocator
        .allocate(&AllocationCreateDesc {
            name: "first",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: true,
            scheme: AllocationScheme::Managed,
        })
        .unwrap();
    let second = allocator
        .allocate(&AllocationCreateDesc {
            name: "second",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: true,
            scheme: AllocationScheme::Managed,
        })
        .unwrap();

    assert_eq!(allocator.report().blocks.len(), 2);

    allocator.free(second).unwrap();
    assert_eq!(allocator.report().blocks.len(), 1, "freeing one of two general blocks should reclaim it");

    allocator.free(first).unwrap();
    assert_eq!(
        allocator.report().blocks.len(),
        1,
        "the last general block in a memory type stays resident (empty) instead of being torn down"
    );
    assert_eq!(allocator.report().total_allocated_bytes, 0);

    allocator.dispose();
}

// Scenario F: an allocation request exceeding the heap itself fails
// immediately rather than ever touching the device.
#[test]
fn scenario_f_request_larger_than_the_heap_is_rejected_up_front() {
    let device = Arc::new(MockDevice::two_types(16 * 1024 * 1024));
    let mut allocator = allocator(device, small_sizes());

    let requirements = MemoryRequirements {
        size: 32 * 1024 * 1024,
        alignment: 256,
        memory_type_bits: 0b11,
    };
    let err = allocator
        .allocate(&AllocationCreateDesc {
            name: "too-big",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: true,
            scheme: AllocationScheme::Managed,
        })
        .unwrap_err();

    assert!(matches!(err, gpu_suballocator::AllocationError::OutOfMemory));
    allocator.dispose();
}

#[test]
fn invalid_alignment_is_rejected_before_any_memory_type_is_touched() {
    let device = Arc::new(MockDevice::two_types(64 * 1024 * 1024));
    let mut allocator = allocator(device, small_sizes());

    let requirements = MemoryRequirements { size: 1024, alignment: 3, memory_type_bits: 0b11 };
    let err = allocator
        .allocate(&AllocationCreateDesc {
            name: "bad-align",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: true,
            scheme: AllocationScheme::Managed,
        })
        .unwrap_err();

    assert!(matches!(err, gpu_suballocator::AllocationError::InvalidAllocationCreateDesc));
    allocator.dispose();
}

#[test]
fn incompatible_type_bits_yield_no_compatible_memory_type() {
    let device = Arc::new(MockDevice::two_types(64 * 1024 * 1024));
    let mut allocator = allocator(device, small_sizes());

    let requirements = MemoryRequirements { size: 1024, alignment: 256, memory_type_bits: 0 };
    let err = allocator
        .allocate(&AllocationCreateDesc {
            name: "no-types",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: true,
            scheme: AllocationScheme::Managed,
        })
        .unwrap_err();

    assert!(matches!(err, gpu_suballocator::AllocationError::NoCompatibleMemoryTypeFound));
    allocator.dispose();
}

#[test]
fn device_allocate_memory_failure_surfaces_as_out_of_memory() {
    let device = Arc::new(MockDevice::two_types(64 * 1024 * 1024));
    let mut allocator = allocator(device.clone(), small_sizes());

    device.fail_next_allocate.set(true);
    let requirements = MemoryRequirements { size: 1024, alignment: 256, memory_type_bits: 0b11 };
    let err = allocator
        .allocate(&AllocationCreateDesc {
            name: "should-fail",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: true,
            scheme: AllocationScheme::Managed,
        })
        .unwrap_err();

    assert!(matches!(err, gpu_suballocator::AllocationError::OutOfMemory));
    assert_eq!(device.live_allocation_count(), 0, "a failed device allocation must not leave a phantom block behind");

    allocator.dispose();
}

#[test]
fn device_map_memory_failure_surfaces_as_failed_to_map_and_frees_the_block() {
    let device = Arc::new(MockDevice::two_types(64 * 1024 * 1024));
    let mut allocator = allocator(device.clone(), small_sizes());

    device.fail_next_map.set(true);
    let requirements = MemoryRequirements { size: 1024, alignment: 256, memory_type_bits: 0b10 };
    let err = allocator
        .allocate(&AllocationCreateDesc {
            name: "should-fail-to-map",
            requirements,
            location: MemoryLocation::GpuToCpu,
            linear: true,
            scheme: AllocationScheme::Managed,
        })
        .unwrap_err();

    assert!(matches!(err, gpu_suballocator::AllocationError::FailedToMap(_)));
    assert_eq!(device.live_allocation_count(), 0, "a failed map must trigger an immediate free_memory on the block it just opened");

    allocator.dispose();
}

#[test]
fn report_leaks_does_not_panic_with_outstanding_allocations() {
    let device = Arc::new(MockDevice::two_types(64 * 1024 * 1024));
    let mut allocator = allocator(device, small_sizes());

    let requirements = MemoryRequirements { size: 1024, alignment: 256, memory_type_bits: 0b11 };
    let _leaked = allocator
        .allocate(&AllocationCreateDesc {
            name: "leaked",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: true,
            scheme: AllocationScheme::Managed,
        })
        .unwrap();

    allocator.report_leaks(LogLevel::Warn);
    allocator.dispose();
}
