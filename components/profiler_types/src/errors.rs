// Profiler error types
// Covers capability gating, session exclusivity, and artifact/sampler failures

use std::path::PathBuf;
use thiserror::Error;

use crate::artifact::ArtifactKind;

/// Errors that can occur while starting or running a capture session
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// The capability flag for this kind of profiling is switched off
    #[error("{0} profiling is not enabled")]
    CapabilityDisabled(ArtifactKind),

    /// A session of this kind is already running
    #[error("{0} capture is already active")]
    AlreadyActive(ArtifactKind),

    /// The output artifact could not be created
    #[error("Failed to create artifact {}: {source}", path.display())]
    ArtifactCreationFailed {
        /// Path that was being created
        path: PathBuf,
        /// Underlying storage error
        #[source]
        source: std::io::Error,
    },

    /// The runtime sampler rejected the start request
    #[error("Failed to start sampler: {0}")]
    SamplerStartFailed(String),

    /// The runtime heap profiler could not produce a snapshot
    #[error("Failed to take heap snapshot: {0}")]
    SnapshotFailed(String),

    /// The session was stopped before its snapshot was taken
    #[error("{0} capture was stopped before a snapshot was taken")]
    Cancelled(ArtifactKind),

    /// A background session was requested with no async runtime to run it on
    #[error("{0} capture requires a running tokio runtime")]
    RuntimeUnavailable(ArtifactKind),

    /// IO error while writing or closing an artifact
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProfilerError {
    /// Whether the caller can treat this error as a no-op and carry on
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProfilerError::CapabilityDisabled(_)
                | ProfilerError::AlreadyActive(_)
                | ProfilerError::Cancelled(_)
        )
    }

    /// The session kind this error refers to, if any
    pub fn kind(&self) -> Option<ArtifactKind> {
        match self {
            ProfilerError::CapabilityDisabled(kind)
            | ProfilerError::AlreadyActive(kind)
            | ProfilerError::Cancelled(kind)
            | ProfilerError::RuntimeUnavailable(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Result type for profiler operations
pub type Result<T> = std::result::Result<T, ProfilerError>;
