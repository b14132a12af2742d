//! Leak-report severity. Kept independent of `tracing::Level` so callers
//! that build this crate without the `logging` feature still get a usable
//! type through the public API.

/// Severity at which [`crate::Allocator::report_leaks`] emits one record per
/// live allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[cfg(feature = "logging")]
pub(crate) fn emit(level: LogLevel, memory_type_index: usize, block_index: usize, name: Option<&str>, offset: u64, size: u64) {
    let name = name.unwrap_or("<unnamed>");
    match level {
        LogLevel::Debug => tracing::debug!(memory_type_index, block_index, name, offset, size, "live allocation"),
        LogLevel::Info => tracing::info!(memory_type_index, block_index, name, offset, size, "live allocation"),
        LogLevel::Warn => tracing::warn!(memory_type_index, block_index, name, offset, size, "live allocation"),
        LogLevel::Error => tracing::error!(memory_type_index, block_index, name, offset, size, "live allocation"),
    }
}

#[cfg(not(feature = "logging"))]
pub(crate) fn emit(_level: LogLevel, _memory_type_index: usize, _block_index: usize, _name: Option<&str>, _offset: u64, _size: u64) {}

/// Block-lifecycle logging gated by `AllocatorDebugSettings::log_memory_information`.
#[cfg(feature = "logging")]
pub(crate) fn block_opened(memory_type_index: u32, block_index: usize, size: u64, dedicated: bool) {
    tracing::info!(memory_type_index, block_index, size, dedicated, "block opened");
}

#[cfg(not(feature = "logging"))]
pub(crate) fn block_opened(_memory_type_index: u32, _block_index: usize, _size: u64, _dedicated: bool) {}

#[cfg(feature = "logging")]
pub(crate) fn block_destroyed(memory_type_index: u32, block_index: usize, size: u64) {
    tracing::info!(memory_type_index, block_index, size, "block destroyed");
}

#[cfg(not(feature = "logging"))]
pub(crate) fn block_destroyed(_memory_type_index: u32, _block_index: usize, _size: u64) {}
