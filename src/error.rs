//! Closed error taxonomy for the allocator.

use thiserror::Error;

/// Everything that can go wrong while creating, sizing or tearing down an
/// [`crate::Allocator`].
///
/// The three `Castable*`/`BarrierLayout*` variants exist so that callers
/// matching exhaustively against a future multi-backend allocator compile
/// unchanged; this crate never constructs them itself.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// No free-list chunk or spare block could satisfy the request.
    #[error("out of memory: no suitable region could be found")]
    OutOfMemory,

    /// A host-visible block was allocated but the driver refused to map it.
    #[error("failed to map memory: {0}")]
    FailedToMap(String),

    /// No memory type in the device's `MemoryProperties` matched both the
    /// request's type-bit mask and any placement-preference tier.
    #[error("no compatible memory type was found for the request")]
    NoCompatibleMemoryTypeFound,

    /// The `AllocationCreateDesc` failed validation (zero size, non-power-of-two
    /// alignment, and similar).
    #[error("invalid allocation create description")]
    InvalidAllocationCreateDesc,

    /// The `AllocatorCreateDesc` failed validation.
    #[error("invalid allocator create description: {0}")]
    InvalidAllocatorCreateDesc(String),

    /// An internal invariant was violated — a bug in this crate, not caller
    /// misuse of the public API.
    #[error("internal allocator error: {0}")]
    Internal(String),

    /// Reserved for a future backend; never raised by this crate.
    #[error("barrier layout requires device 1.0 support")]
    BarrierLayoutNeedsDevice10,

    /// Reserved for a future backend; never raised by this crate.
    #[error("castable formats requires enhanced barriers")]
    CastableFormatsRequiresEnhancedBarriers,

    /// Reserved for a future backend; never raised by this crate.
    #[error("castable formats requires at least device 1.2")]
    CastableFormatsRequiresAtLeastDevice12,
}

/// Convenience alias used throughout the crate.
pub type AllocationResult<T> = Result<T, AllocationError>;
