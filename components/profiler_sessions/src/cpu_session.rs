//! CPU capture session
//!
//! States: idle -> capturing -> idle. The session lock is held only for the
//! start and stop calls; sampling runs in the runtime sampler in between.

use profiler_runtime::ProfileFormat;
use profiler_types::{Artifact, ArtifactKind, ProfilerError, Result, SessionStatus};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::profiler::Profiler;

/// State of the CPU capture session
#[derive(Debug)]
pub(crate) enum CpuSession {
    /// No capture running
    Idle,
    /// Sampler attached and artifact owned by the session
    Active {
        artifact: Artifact,
        started_at: Instant,
    },
}

/// Describes a CPU capture that was started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuCaptureHandle {
    path: PathBuf,
    started_at: SystemTime,
}

impl CpuCaptureHandle {
    /// Artifact the profile will be written to on stop
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wall-clock start of the capture
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }
}

impl Profiler {
    /// Start a CPU capture into a new `cpu.pprof.<unixtime>.out` artifact
    ///
    /// # Errors
    ///
    /// - [`ProfilerError::CapabilityDisabled`] if CPU profiling is off
    /// - [`ProfilerError::AlreadyActive`] if a capture is already running
    /// - [`ProfilerError::ArtifactCreationFailed`] if the file cannot be created
    /// - [`ProfilerError::SamplerStartFailed`] if the runtime sampler refuses;
    ///   the artifact is removed and nothing is retained
    pub fn start_cpu_capture(&self) -> Result<CpuCaptureHandle> {
        let mut session = self.cpu.lock();

        let (enabled, output_dir) = {
            let config = self.config.read();
            (config.cpu_enabled(), config.output_dir().to_path_buf())
        };

        if !enabled {
            return Err(ProfilerError::CapabilityDisabled(ArtifactKind::Cpu));
        }

        if let CpuSession::Active { artifact, .. } = &*session {
            warn!(path = %artifact.path().display(), "CPU capture already active");
            return Err(ProfilerError::AlreadyActive(ArtifactKind::Cpu));
        }

        let artifact = Artifact::create(&output_dir, ArtifactKind::Cpu).map_err(|e| {
            error!(error = %e, "Failed to create CPU profile artifact");
            e
        })?;

        if let Err(e) = self.cpu_sampler.start() {
            error!(error = %e, "Failed to start CPU sampler");
            artifact.discard();
            return Err(ProfilerError::SamplerStartFailed(e.to_string()));
        }

        let handle = CpuCaptureHandle {
            path: artifact.path().to_path_buf(),
            started_at: SystemTime::now(),
        };
        info!(path = %handle.path.display(), "CPU capture started");

        *session = CpuSession::Active {
            artifact,
            started_at: Instant::now(),
        };

        Ok(handle)
    }

    /// Stop the running CPU capture, write its profile, and close the artifact
    ///
    /// With no capture running this logs a warning and touches no files. Never
    /// fails; write errors are logged. Returns the closed artifact's path.
    pub fn stop_cpu_capture(&self) -> Option<PathBuf> {
        let mut session = self.cpu.lock();

        let (mut artifact, started_at) = match std::mem::replace(&mut *session, CpuSession::Idle) {
            CpuSession::Active {
                artifact,
                started_at,
            } => (artifact, started_at),
            CpuSession::Idle => {
                warn!("stop_cpu_capture called with no active CPU capture");
                return None;
            }
        };

        match self.cpu_sampler.stop(ProfileFormat::Pprof) {
            Ok(profile) => {
                if let Err(e) = artifact.write_profile(&profile) {
                    error!(path = %artifact.path().display(), error = %e, "Failed to write CPU profile");
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to stop CPU sampler cleanly");
            }
        }

        match artifact.close() {
            Ok(path) => {
                info!(
                    path = %path.display(),
                    elapsed = ?started_at.elapsed(),
                    "CPU capture stopped"
                );
                Some(path)
            }
            Err(e) => {
                error!(error = %e, "Failed to close CPU profile artifact");
                None
            }
        }
    }

    /// Whether a CPU capture is running
    pub fn is_cpu_capturing(&self) -> bool {
        matches!(*self.cpu.lock(), CpuSession::Active { .. })
    }

    /// Current state of the CPU session
    pub fn cpu_status(&self) -> SessionStatus {
        match *self.cpu.lock() {
            CpuSession::Idle => SessionStatus::Idle,
            CpuSession::Active { .. } => SessionStatus::Capturing,
        }
    }
}
