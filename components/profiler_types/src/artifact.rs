// Profile artifacts written to disk
// Naming follows `<prefix>.pprof.<unixtime>.out` with a numeric suffix on collision

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::errors::{ProfilerError, Result};

/// Upper bound on suffixed names tried before giving up on a timestamp
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Kind of profile an artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// CPU sampling profile
    Cpu,
    /// Heap snapshot
    Memory,
}

impl ArtifactKind {
    /// File name prefix for this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Cpu => "cpu",
            ArtifactKind::Memory => "mem",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Cpu => write!(f, "CPU"),
            ArtifactKind::Memory => write!(f, "memory"),
        }
    }
}

/// Current Unix time in whole seconds
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Build the artifact file name for a kind and timestamp
///
/// Attempt 0 yields the plain name; later attempts insert the attempt number
/// before the extension so that same-second sessions never share a file.
pub fn artifact_file_name(kind: ArtifactKind, unix_time: u64, attempt: u32) -> String {
    if attempt == 0 {
        format!("{}.pprof.{}.out", kind.prefix(), unix_time)
    } else {
        format!("{}.pprof.{}.{}.out", kind.prefix(), unix_time, attempt)
    }
}

/// An open profile artifact exclusively owned by one capture session
#[derive(Debug)]
pub struct Artifact {
    kind: ArtifactKind,
    path: PathBuf,
    file: File,
    created_at: Instant,
    bytes_written: u64,
}

impl Artifact {
    /// Create a new artifact of the given kind inside `dir`
    pub fn create(dir: &Path, kind: ArtifactKind) -> Result<Self> {
        Self::create_at(dir, kind, unix_timestamp())
    }

    /// Create a new artifact named after an explicit timestamp
    pub fn create_at(dir: &Path, kind: ArtifactKind, unix_time: u64) -> Result<Self> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = dir.join(artifact_file_name(kind, unix_time, attempt));

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    debug!(path = %path.display(), "Created {} artifact", kind);
                    return Ok(Self {
                        kind,
                        path,
                        file,
                        created_at: Instant::now(),
                        bytes_written: 0,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(ProfilerError::ArtifactCreationFailed { path, source }),
            }
        }

        Err(ProfilerError::ArtifactCreationFailed {
            path: dir.join(artifact_file_name(kind, unix_time, MAX_NAME_ATTEMPTS - 1)),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "no free artifact name for this timestamp",
            ),
        })
    }

    /// Kind of profile held by this artifact
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Location of the artifact on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the artifact was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Number of profile bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Append encoded profile bytes
    pub fn write_profile(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Flush to storage and release the handle
    pub fn close(mut self) -> Result<PathBuf> {
        self.file.flush()?;
        self.file.sync_all()?;
        debug!(
            path = %self.path.display(),
            bytes = self.bytes_written,
            "Closed {} artifact",
            self.kind
        );
        Ok(self.path)
    }

    /// Release the handle and remove the partially written file
    pub fn discard(self) {
        let Artifact { path, file, .. } = self;
        drop(file);
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "Failed to remove discarded artifact");
        }
    }
}
