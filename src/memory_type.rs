//! Manages the pool of blocks backing one memory type.

use std::ptr::NonNull;

use crate::allocation::Allocation;
use crate::block::MemoryBlock;
use crate::device::{DedicatedAllocationHint, MemoryDevice, MemoryPropertyFlags};
use crate::error::{AllocationError, AllocationResult};
use crate::location::{AllocationScheme, ResourceKind};

/// A pending request translated from the caller-facing
/// `AllocationCreateDesc`, internal to the façade/memory-type boundary.
#[derive(Clone)]
pub(crate) struct Request {
    pub size: u64,
    pub alignment: u64,
    pub linear: bool,
    pub scheme: AllocationScheme,
    pub name: Option<String>,
}

/// All blocks backing one memory type. Slots are present/absent rather than
/// removed outright, so a freed block's index can be reused without
/// shifting every allocation's `block_index`.
#[derive(Debug)]
pub struct MemoryType {
    blocks: Vec<Option<MemoryBlock>>,
    memory_type_index: u32,
    property_flags: MemoryPropertyFlags,
    heap_index: u32,
    mappable: bool,
    block_size: u64,
    active_general_blocks: usize,
    log_memory_information: bool,
}

impl MemoryType {
    pub(crate) fn new(memory_type_index: u32, property_flags: MemoryPropertyFlags, heap_index: u32, mappable: bool, block_size: u64, log_memory_information: bool) -> Self {
        Self {
            blocks: Vec::new(),
            memory_type_index,
            property_flags,
            heap_index,
            mappable,
            block_size,
            active_general_blocks: 0,
            log_memory_information,
        }
    }

    #[must_use]
    pub fn memory_type_index(&self) -> u32 {
        self.memory_type_index
    }

    #[must_use]
    pub fn property_flags(&self) -> MemoryPropertyFlags {
        self.property_flags
    }

    #[must_use]
    pub fn heap_index(&self) -> u32 {
        self.heap_index
    }

    #[must_use]
    pub fn active_general_blocks(&self) -> usize {
        self.active_general_blocks
    }

    pub(crate) fn blocks(&self) -> impl Iterator<Item = (usize, &MemoryBlock)> {
        self.blocks.iter().enumerate().filter_map(|(index, block)| block.as_ref().map(|block| (index, block)))
    }

    pub(crate) fn allocate(&mut self, device: &dyn MemoryDevice, request: Request, granularity: u64, device_address: bool) -> AllocationResult<Allocation> {
        let dedicated = request.scheme.is_dedicated();
        let requires_own_block = request.size > self.block_size;

        if dedicated || requires_own_block {
            return self.allocate_single_block(device, request, device_address, dedicated);
        }
        self.allocate_managed(device, request, granularity)
    }

    fn allocate_single_block(&mut self, device: &dyn MemoryDevice, request: Request, device_address: bool, dedicated: bool) -> AllocationResult<Allocation> {
        let hint = DedicatedAllocationHint {
            dedicated_buffer: matches!(request.scheme, AllocationScheme::DedicatedBuffer(_)),
            dedicated_image: matches!(request.scheme, AllocationScheme::DedicatedImage(_)),
            device_address,
        };
        let block = MemoryBlock::new(device, request.size, self.memory_type_index, self.mappable, hint, true)?;
        let block_index = self.place_block(block);
        if self.log_memory_information {
            crate::log::block_opened(self.memory_type_index, block_index, request.size, true);
        }

        let kind = ResourceKind::from_linear(request.linear);
        let block = self.blocks[block_index].as_mut().expect("just placed");
        let (offset, chunk_id) = block.sub_allocator.allocate(request.size, request.alignment, kind, 1, request.name.clone())?;

        Ok(self.build_allocation(block_index, offset, chunk_id, request.size, dedicated, request.name))
    }

    fn allocate_managed(&mut self, device: &dyn MemoryDevice, request: Request, granularity: u64) -> AllocationResult<Allocation> {
        let kind = ResourceKind::from_linear(request.linear);
        let mut reuse_slot: Option<usize> = None;

        for index in (0..self.blocks.len()).rev() {
            match &mut self.blocks[index] {
                Some(block) => match block.sub_allocator.allocate(request.size, request.alignment, kind, granularity, request.name.clone()) {
                    Ok((offset, chunk_id)) => {
                        return Ok(self.build_allocation(index, offset, chunk_id, request.size, false, request.name));
                    }
                    Err(AllocationError::OutOfMemory) => continue,
                    Err(other) => return Err(other),
                },
                None => reuse_slot = Some(index),
            }
        }

        let hint = DedicatedAllocationHint::default();
        let block = MemoryBlock::new(device, self.block_size, self.memory_type_index, self.mappable, hint, false)?;
        let block_index = match reuse_slot {
            Some(index) => {
                self.blocks[index] = Some(block);
                index
            }
            None => {
                self.blocks.push(Some(block));
                self.blocks.len() - 1
            }
        };
        self.active_general_blocks += 1;
        if self.log_memory_information {
            crate::log::block_opened(self.memory_type_index, block_index, self.block_size, false);
        }

        let block = self.blocks[block_index].as_mut().expect("just placed");
        let (offset, chunk_id) = block
            .sub_allocator
            .allocate(request.size, request.alignment, kind, granularity, request.name.clone())
            .map_err(|err| AllocationError::Internal(format!("newly opened block rejected its own allocation: {err}")))?;

        Ok(self.build_allocation(block_index, offset, chunk_id, request.size, false, request.name))
    }

    pub(crate) fn free(&mut self, device: &dyn MemoryDevice, allocation: &Allocation) -> AllocationResult<()> {
        let Some(chunk_id) = allocation.chunk_id else {
            return Ok(());
        };
        let block_index = allocation.block_index;

        let is_general = {
            let block = self
                .blocks
                .get_mut(block_index)
                .and_then(Option::as_mut)
                .ok_or_else(|| AllocationError::Internal("free: block index out of range".into()))?;
            block.sub_allocator.free(chunk_id)?;
            !block.dedicated
        };

        let block = self.blocks[block_index].as_ref().expect("checked above");
        if block.sub_allocator.is_empty() {
            // Keep at least one warm general block per memory type so we
            // don't oscillate opening/closing the driver's only block.
            let keep_resident = is_general && self.active_general_blocks <= 1;
            if !keep_resident {
                let block = self.blocks[block_index].take().expect("checked above");
                if self.log_memory_information {
                    crate::log::block_destroyed(self.memory_type_index, block_index, block.size);
                }
                block.destroy(device);
                if is_general {
                    self.active_general_blocks -= 1;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn rename(&mut self, chunk_id: crate::chunk::ChunkId, block_index: usize, name: Option<String>) -> AllocationResult<()> {
        let block = self
            .blocks
            .get_mut(block_index)
            .and_then(Option::as_mut)
            .ok_or_else(|| AllocationError::Internal("rename: block index out of range".into()))?;
        block.sub_allocator.rename(chunk_id, name)
    }

    pub(crate) fn dispose(&mut self, device: &dyn MemoryDevice) {
        let log_memory_information = self.log_memory_information;
        let memory_type_index = self.memory_type_index;
        for (index, slot) in self.blocks.drain(..).enumerate() {
            if let Some(block) = slot {
                if log_memory_information {
                    crate::log::block_destroyed(memory_type_index, index, block.size);
                }
                block.destroy(device);
            }
        }
        self.active_general_blocks = 0;
    }

    fn place_block(&mut self, block: MemoryBlock) -> usize {
        if let Some(index) = self.blocks.iter().position(Option::is_none) {
            self.blocks[index] = Some(block);
            index
        } else {
            self.blocks.push(Some(block));
            self.blocks.len() - 1
        }
    }

    fn build_allocation(&self, block_index: usize, offset: u64, chunk_id: crate::chunk::ChunkId, size: u64, dedicated: bool, name: Option<String>) -> Allocation {
        let block = self.blocks[block_index].as_ref().expect("just allocated into it");
        let mapped_ptr = block.mapped_ptr.map(|ptr| unsafe { NonNull::new_unchecked(ptr.as_ptr().add(offset as usize)) });
        Allocation {
            chunk_id: Some(chunk_id),
            offset,
            size,
            block_index,
            memory_type_index: self.memory_type_index,
            device_memory: block.device_memory,
            mapped_ptr,
            memory_properties: self.property_flags,
            dedicated,
            name,
        }
    }
}
