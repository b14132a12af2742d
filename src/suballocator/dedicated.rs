//! Single-occupant sub-allocator for blocks that back exactly one resource.

use crate::chunk::ChunkId;
use crate::error::{AllocationError, AllocationResult};
use crate::location::ResourceKind;
use crate::log::{self, LogLevel};

use super::{AllocationReport, SubAllocator};

/// Treats an entire block as one chunk; `allocate` succeeds exactly once.
#[derive(Debug)]
pub struct DedicatedBlockAllocator {
    size: u64,
    allocated: u64,
    name: Option<String>,
}

const THE_ONE_CHUNK: u64 = 1;

impl DedicatedBlockAllocator {
    #[must_use]
    pub fn new(size: u64) -> Self {
        Self { size, allocated: 0, name: None }
    }
}

impl SubAllocator for DedicatedBlockAllocator {
    fn allocate(&mut self, size: u64, _alignment: u64, _kind: ResourceKind, _granularity: u64, name: Option<String>) -> AllocationResult<(u64, ChunkId)> {
        if self.allocated != 0 {
            return Err(AllocationError::Internal("dedicated block already occupied".into()));
        }
        if size != self.size {
            return Err(AllocationError::OutOfMemory);
        }
        self.allocated = self.size;
        self.name = name;
        Ok((0, ChunkId::new(THE_ONE_CHUNK).expect("1 is a valid NonZeroU64")))
    }

    fn free(&mut self, chunk_id: ChunkId) -> AllocationResult<()> {
        if chunk_id.get() != THE_ONE_CHUNK {
            return Err(AllocationError::Internal("dedicated free: unknown chunk id".into()));
        }
        if self.allocated == 0 {
            return Err(AllocationError::Internal("dedicated free: block is already empty".into()));
        }
        self.allocated = 0;
        self.name = None;
        Ok(())
    }

    fn rename(&mut self, chunk_id: ChunkId, name: Option<String>) -> AllocationResult<()> {
        if chunk_id.get() != THE_ONE_CHUNK || self.allocated == 0 {
            return Err(AllocationError::Internal("dedicated rename: no such occupant".into()));
        }
        self.name = name;
        Ok(())
    }

    fn report_allocations(&self) -> Vec<AllocationReport> {
        if self.allocated == 0 {
            Vec::new()
        } else {
            vec![AllocationReport {
                name: self.name.clone(),
                offset: 0,
                size: self.size,
            }]
        }
    }

    fn report_leaks(&self, level: LogLevel, memory_type_index: usize, block_index: usize) {
        if self.allocated != 0 {
            log::emit(level, memory_type_index, block_index, self.name.as_deref(), 0, self.size);
        }
    }

    fn supports_general(&self) -> bool {
        false
    }

    fn allocated_bytes(&self) -> u64 {
        self.allocated
    }
}
