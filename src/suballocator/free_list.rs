//! Best-fit free-list sub-allocator over a single block's address range.

use std::collections::{BTreeMap, BTreeSet};

use crate::chunk::{Chunk, ChunkId};
use crate::error::{AllocationError, AllocationResult};
use crate::location::{conflicts, ResourceKind};
use crate::log::{self, LogLevel};
use crate::util::{align_up, same_page};

use super::{AllocationReport, SubAllocator};

/// A doubly-linked chunk list addressed by integer id rather than owned
/// nodes, so splitting and coalescing never touch more than a handful of
/// map entries.
#[derive(Debug)]
pub struct FreeListAllocator {
    chunks: BTreeMap<ChunkId, Chunk>,
    free: BTreeSet<ChunkId>,
    block_size: u64,
    allocated: u64,
    next_id: u64,
}

impl FreeListAllocator {
    #[must_use]
    pub fn new(block_size: u64) -> Self {
        let initial = ChunkId::new(1).expect("1 is a valid NonZeroU64");
        let mut chunks = BTreeMap::new();
        chunks.insert(
            initial,
            Chunk {
                id: initial,
                offset: 0,
                size: block_size,
                kind: None,
                name: None,
                prev: None,
                next: None,
            },
        );
        let mut free = BTreeSet::new();
        free.insert(initial);
        Self {
            chunks,
            free,
            block_size,
            allocated: 0,
            next_id: 2,
        }
    }

    fn alloc_chunk_id(&mut self) -> AllocationResult<ChunkId> {
        let id = ChunkId::new(self.next_id).ok_or(AllocationError::OutOfMemory)?;
        self.next_id = self.next_id.checked_add(1).ok_or(AllocationError::OutOfMemory)?;
        Ok(id)
    }

    /// Merges `right` into `left`; `right` must be free. `left` keeps its id.
    fn coalesce(&mut self, left: ChunkId, right: ChunkId) {
        let removed = self.chunks.remove(&right).expect("coalesce: right chunk missing");
        self.free.remove(&right);
        let next = removed.next;
        let left_chunk = self.chunks.get_mut(&left).expect("coalesce: left chunk missing");
        left_chunk.size += removed.size;
        left_chunk.next = next;
        if let Some(next_id) = next {
            self.chunks.get_mut(&next_id).expect("coalesce: next chunk missing").prev = Some(left);
        }
    }
}

impl SubAllocator for FreeListAllocator {
    fn allocate(&mut self, size: u64, alignment: u64, kind: ResourceKind, granularity: u64, name: Option<String>) -> AllocationResult<(u64, ChunkId)> {
        if size == 0 {
            return Err(AllocationError::Internal("free list allocate: zero-size request".into()));
        }

        // (chunk id, offset, aligned size including padding, free chunk's size)
        let mut best: Option<(ChunkId, u64, u64, u64)> = None;

        for &id in &self.free {
            let chunk = &self.chunks[&id];
            if chunk.size < size {
                continue;
            }

            let mut offset = align_up(chunk.offset, alignment);

            if let Some(prev_id) = chunk.prev {
                let prev = &self.chunks[&prev_id];
                if conflicts(prev.kind, Some(kind)) && same_page(prev.offset + prev.size - 1, offset, granularity) {
                    offset = align_up(offset, granularity);
                }
            }

            let padding = offset - chunk.offset;
            let Some(aligned_size) = padding.checked_add(size) else {
                continue;
            };
            if aligned_size > chunk.size {
                continue;
            }

            if let Some(next_id) = chunk.next {
                let next = &self.chunks[&next_id];
                if conflicts(Some(kind), next.kind) && same_page(offset + size - 1, next.offset, granularity) {
                    continue;
                }
            }

            let better = match best {
                None => true,
                Some((_, _, _, best_chunk_size)) => chunk.size < best_chunk_size,
            };
            if better {
                best = Some((id, offset, aligned_size, chunk.size));
            }
        }

        let (chunk_id, offset, aligned_size, chunk_size) = best.ok_or(AllocationError::OutOfMemory)?;
        let chunk_offset = self.chunks[&chunk_id].offset;
        let chunk_prev = self.chunks[&chunk_id].prev;

        let claimed_id = if chunk_size > aligned_size {
            let new_id = self.alloc_chunk_id()?;
            self.chunks.insert(
                new_id,
                Chunk {
                    id: new_id,
                    offset: chunk_offset,
                    size: aligned_size,
                    kind: Some(kind),
                    name,
                    prev: chunk_prev,
                    next: Some(chunk_id),
                },
            );
            if let Some(prev_id) = chunk_prev {
                self.chunks.get_mut(&prev_id).expect("allocate: prev chunk missing").next = Some(new_id);
            }
            let remainder = self.chunks.get_mut(&chunk_id).expect("allocate: remainder chunk missing");
            remainder.offset = chunk_offset + aligned_size;
            remainder.size = chunk_size - aligned_size;
            remainder.prev = Some(new_id);
            new_id
        } else {
            self.free.remove(&chunk_id);
            let occupant = self.chunks.get_mut(&chunk_id).expect("allocate: chunk missing");
            occupant.kind = Some(kind);
            occupant.name = name;
            chunk_id
        };

        self.allocated += aligned_size;
        Ok((offset, claimed_id))
    }

    fn free(&mut self, chunk_id: ChunkId) -> AllocationResult<()> {
        let size = {
            let chunk = self.chunks.get_mut(&chunk_id).ok_or_else(|| AllocationError::Internal("free: unknown chunk id".into()))?;
            if chunk.is_free() {
                return Err(AllocationError::Internal("free: chunk is already free".into()));
            }
            chunk.kind = None;
            chunk.name = None;
            chunk.size
        };
        self.allocated -= size;
        self.free.insert(chunk_id);

        if let Some(next_id) = self.chunks[&chunk_id].next {
            if self.chunks[&next_id].is_free() {
                self.coalesce(chunk_id, next_id);
            }
        }
        if let Some(prev_id) = self.chunks[&chunk_id].prev {
            if self.chunks[&prev_id].is_free() {
                self.coalesce(prev_id, chunk_id);
            }
        }
        Ok(())
    }

    fn rename(&mut self, chunk_id: ChunkId, name: Option<String>) -> AllocationResult<()> {
        let chunk = self.chunks.get_mut(&chunk_id).ok_or_else(|| AllocationError::Internal("rename: unknown chunk id".into()))?;
        if chunk.is_free() {
            return Err(AllocationError::Internal("rename: chunk is free".into()));
        }
        chunk.name = name;
        Ok(())
    }

    fn report_allocations(&self) -> Vec<AllocationReport> {
        self.chunks
            .values()
            .filter(|chunk| !chunk.is_free())
            .map(|chunk| AllocationReport {
                name: chunk.name.clone(),
                offset: chunk.offset,
                size: chunk.size,
            })
            .collect()
    }

    fn report_leaks(&self, level: LogLevel, memory_type_index: usize, block_index: usize) {
        for chunk in self.chunks.values().filter(|chunk| !chunk.is_free()) {
            log::emit(level, memory_type_index, block_index, chunk.name.as_deref(), chunk.offset, chunk.size);
        }
    }

    fn supports_general(&self) -> bool {
        true
    }

    fn allocated_bytes(&self) -> u64 {
        self.allocated
    }
}
