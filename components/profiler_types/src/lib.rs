// Profiling artifact types, session states, and error definitions
//
// This module is part of the CortenBrowser profiling implementation.

pub mod artifact;
pub mod errors;
pub mod session;

// Re-export commonly used types
pub use artifact::{artifact_file_name, unix_timestamp, Artifact, ArtifactKind};
pub use errors::{ProfilerError, Result};
pub use session::SessionStatus;
