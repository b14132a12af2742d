//! The free-list's addressable unit: one contiguous span of a block, either
//! free or occupied by exactly one placed resource.

use std::num::NonZeroU64;

use crate::location::ResourceKind;

/// Identifies a [`Chunk`] within one [`crate::suballocator::free_list::FreeListAllocator`].
/// `0` is reserved and never issued, which lets `Option<ChunkId>` fit in a
/// single word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(NonZeroU64);

impl ChunkId {
    pub(crate) fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// One span of a block's address range.
#[derive(Debug, Clone)]
pub(crate) struct Chunk {
    pub id: ChunkId,
    pub offset: u64,
    pub size: u64,
    /// `None` when this chunk is free.
    pub kind: Option<ResourceKind>,
    pub name: Option<String>,
    pub prev: Option<ChunkId>,
    pub next: Option<ChunkId>,
}

impl Chunk {
    pub fn is_free(&self) -> bool {
        self.kind.is_none()
    }
}
