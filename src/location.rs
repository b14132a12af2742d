//! Placement preferences and resource-kind tagging.

/// Where the caller intends to access an allocation from, used to select a
/// memory type's placement preference tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// No preference; take the first compatible type.
    Unknown,
    /// Accessed only from the GPU — prefer device-local memory.
    GpuOnly,
    /// Written by the CPU, read by the GPU — prefer host-visible,
    /// host-coherent, device-local memory, falling back to any
    /// host-visible, host-coherent type.
    CpuToGpu,
    /// Written by the GPU, read by the CPU — prefer host-visible,
    /// host-coherent, host-cached memory.
    GpuToCpu,
}

/// How a requested allocation should be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationScheme {
    /// Share a general block with other allocations of the same memory type.
    Managed,
    /// Requires its own block because it will be bound to this buffer handle.
    DedicatedBuffer(u64),
    /// Requires its own block because it will be bound to this image handle.
    DedicatedImage(u64),
}

impl AllocationScheme {
    #[must_use]
    pub fn is_dedicated(&self) -> bool {
        !matches!(self, Self::Managed)
    }
}

/// The buffer-image granularity conflict class of a placed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Linear,
    NonLinear,
}

impl ResourceKind {
    #[must_use]
    pub fn from_linear(linear: bool) -> Self {
        if linear {
            Self::Linear
        } else {
            Self::NonLinear
        }
    }
}

/// Two resource kinds "conflict" — and so must respect buffer-image
/// granularity padding at their shared boundary — iff both are present and
/// different.
#[must_use]
pub fn conflicts(a: Option<ResourceKind>, b: Option<ResourceKind>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a != b)
}
