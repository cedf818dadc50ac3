//! Error types for runtime profiling backends

use thiserror::Error;

/// Errors reported by the runtime sampler and heap profiler
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A sampling session is already attached to this sampler
    #[error("CPU sampler is already running")]
    SamplerBusy,

    /// Stop was requested with no sampling session attached
    #[error("CPU sampler is not running")]
    SamplerNotRunning,

    /// Sampling frequency must be a positive number of Hz
    #[error("Invalid CPU sampling frequency: {0} Hz")]
    InvalidFrequency(i32),

    /// The sampling backend failed
    #[error("CPU sampler error: {0}")]
    Sampler(String),

    /// Heap profiling is not compiled in or not activated
    #[error("Heap profiling unavailable: {0}")]
    HeapProfilingUnavailable(String),

    /// The heap profiler failed to produce a snapshot
    #[error("Heap snapshot error: {0}")]
    Snapshot(String),
}

/// Result type for runtime backend operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
