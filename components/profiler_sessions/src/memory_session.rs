//! Memory capture session
//!
//! States: idle -> waiting -> capturing -> idle. A capture routine owns the
//! session lock for its whole body, so a second start while one is in flight
//! fails fast instead of queueing behind it.

use parking_lot::Mutex;
use profiler_types::{Artifact, ArtifactKind, ProfilerError, Result, SessionStatus};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::profiler::Profiler;

/// State of the memory capture session
#[derive(Debug)]
pub(crate) enum MemorySession {
    /// No capture in flight
    Idle,
    /// Capture accepted, waiting out its warmup delay
    Waiting { capture_id: u64, requested_at: Instant },
    /// Artifact created and snapshot written; holding the capture window
    Active {
        capture_id: u64,
        path: PathBuf,
        created_at: Instant,
    },
}

impl MemorySession {
    fn status(&self) -> SessionStatus {
        match self {
            MemorySession::Idle => SessionStatus::Idle,
            MemorySession::Waiting { .. } => SessionStatus::Waiting,
            MemorySession::Active { .. } => SessionStatus::Capturing,
        }
    }
}

/// Observable side of an in-flight memory capture
///
/// Lives outside the session lock so status queries and stop requests never
/// wait for the capture routine.
#[derive(Debug)]
pub(crate) struct MemoryInFlight {
    capture_id: u64,
    status: SessionStatus,
    cancel: Option<watch::Sender<bool>>,
}

/// Exclusive claim on the memory session held by one capture routine
///
/// Dropping the claim returns the session to idle, including when the routine
/// is abandoned mid-wait.
struct SessionClaim {
    capture_id: u64,
    in_flight: Arc<Mutex<Option<MemoryInFlight>>>,
    state: OwnedMutexGuard<MemorySession>,
}

impl SessionClaim {
    fn transition(&mut self, next: MemorySession) {
        let status = next.status();
        *self.state = next;

        if let Some(flight) = self.in_flight.lock().as_mut() {
            if flight.capture_id == self.capture_id {
                flight.status = status;
            }
        }
    }

    fn is_waiting(&self) -> bool {
        matches!(
            *self.state,
            MemorySession::Waiting { capture_id, .. } if capture_id == self.capture_id
        )
    }
}

impl Drop for SessionClaim {
    fn drop(&mut self) {
        match std::mem::replace(&mut *self.state, MemorySession::Idle) {
            MemorySession::Waiting {
                capture_id,
                requested_at,
            } => {
                debug!(
                    capture_id,
                    waited = ?requested_at.elapsed(),
                    "Memory session released before artifact creation"
                );
            }
            MemorySession::Active {
                capture_id,
                path,
                created_at,
            } => {
                debug!(
                    capture_id,
                    path = %path.display(),
                    held = ?created_at.elapsed(),
                    "Memory session released"
                );
            }
            MemorySession::Idle => {}
        }

        let mut slot = self.in_flight.lock();
        if slot.as_ref().map(|flight| flight.capture_id) == Some(self.capture_id) {
            *slot = None;
        }
    }
}

/// Outcome of a completed memory capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCaptureReport {
    path: PathBuf,
    snapshot_bytes: u64,
    created_at: Instant,
    closed_at: Instant,
    stopped_early: bool,
}

impl MemoryCaptureReport {
    /// Closed artifact holding the heap snapshot
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the snapshot written
    pub fn snapshot_bytes(&self) -> u64 {
        self.snapshot_bytes
    }

    /// When the artifact was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the artifact was closed
    pub fn closed_at(&self) -> Instant {
        self.closed_at
    }

    /// How long the artifact was held open
    pub fn held_for(&self) -> Duration {
        self.closed_at.duration_since(self.created_at)
    }

    /// Whether `stop_memory_capture` cut the window short
    pub fn stopped_early(&self) -> bool {
        self.stopped_early
    }
}

/// Handle to a memory capture running in the background
///
/// Dropping the handle does not cancel the capture.
#[derive(Debug)]
pub struct MemoryCaptureHandle {
    capture_id: u64,
    requested_at: Instant,
    done: oneshot::Receiver<Option<MemoryCaptureReport>>,
}

impl MemoryCaptureHandle {
    /// Identifier of this capture
    pub fn capture_id(&self) -> u64 {
        self.capture_id
    }

    /// When the capture was accepted
    pub fn requested_at(&self) -> Instant {
        self.requested_at
    }

    /// Wait for the capture routine to finish
    ///
    /// Returns `None` when the routine ended without closing an artifact
    /// (cancelled during warmup, artifact or snapshot failure).
    pub async fn completed(self) -> Option<MemoryCaptureReport> {
        self.done.await.ok().flatten()
    }
}

/// Sleep for `delay` unless a stop request arrives first
///
/// Returns true when stopped.
async fn wait_or_cancel(delay: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
    let stopped = async {
        if cancel.wait_for(|stopped| *stopped).await.is_err() {
            // Switch dropped without a stop request
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = stopped => true,
    }
}

impl Profiler {
    /// Start a memory capture in the background
    ///
    /// Waits `warmup_delay`, creates `mem.pprof.<unixtime>.out`, writes one
    /// heap snapshot, holds the artifact open for `duration`, then closes it.
    /// Returns as soon as the capture is accepted.
    ///
    /// # Errors
    ///
    /// - [`ProfilerError::CapabilityDisabled`] if memory profiling is off
    /// - [`ProfilerError::AlreadyActive`] if a capture is in flight
    /// - [`ProfilerError::RuntimeUnavailable`] if called outside a tokio
    ///   runtime; the session is left idle
    ///
    /// Failures inside the routine are logged and surface as `None` from
    /// [`MemoryCaptureHandle::completed`].
    pub fn start_memory_capture(
        &self,
        duration: Duration,
        warmup_delay: Duration,
    ) -> Result<MemoryCaptureHandle> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "Cannot start memory capture outside a tokio runtime");
                return Err(ProfilerError::RuntimeUnavailable(ArtifactKind::Memory));
            }
        };
        let (claim, cancel) = self.claim_memory_session()?;
        let capture_id = claim.capture_id;
        let requested_at = Instant::now();
        let (done_tx, done_rx) = oneshot::channel();

        debug!(
            capture_id,
            ?duration,
            ?warmup_delay,
            "Memory capture accepted"
        );

        let profiler = self.clone();
        runtime.spawn(async move {
            let report = match profiler
                .run_memory_capture(claim, duration, warmup_delay, cancel)
                .await
            {
                Ok(report) => Some(report),
                Err(e) if e.is_recoverable() => {
                    warn!(capture_id, error = %e, "Memory capture ended without a snapshot");
                    None
                }
                Err(e) => {
                    error!(capture_id, error = %e, "Memory capture failed");
                    None
                }
            };
            let _ = done_tx.send(report);
        });

        Ok(MemoryCaptureHandle {
            capture_id,
            requested_at,
            done: done_rx,
        })
    }

    /// Run a memory capture inline and wait for it to finish
    ///
    /// Same sequence as [`Profiler::start_memory_capture`] with every error
    /// returned to the caller. Stopping during the warmup yields
    /// [`ProfilerError::Cancelled`].
    pub async fn capture_memory_profile(
        &self,
        duration: Duration,
        warmup_delay: Duration,
    ) -> Result<MemoryCaptureReport> {
        let (claim, cancel) = self.claim_memory_session()?;
        self.run_memory_capture(claim, duration, warmup_delay, cancel)
            .await
    }

    /// Cut the in-flight memory capture short
    ///
    /// A capture in its warmup ends without creating an artifact; a capture
    /// holding its window closes the artifact immediately. Returns true while
    /// a capture is in flight, including one already asked to stop. With
    /// nothing in flight this logs a warning and returns false.
    pub fn stop_memory_capture(&self) -> bool {
        // Outer None: nothing in flight. Inner None: stop already requested.
        let request = self
            .memory_in_flight
            .lock()
            .as_mut()
            .map(|flight| (flight.capture_id, flight.cancel.take()));

        match request {
            Some((capture_id, Some(cancel))) => {
                cancel.send_replace(true);
                info!(capture_id, "Memory capture stop requested");
                true
            }
            Some((capture_id, None)) => {
                debug!(capture_id, "Memory capture stop already requested");
                true
            }
            None => {
                warn!("stop_memory_capture called with no active memory capture");
                false
            }
        }
    }

    /// Whether a memory capture is waiting or capturing
    pub fn is_memory_capturing(&self) -> bool {
        self.memory_status().is_busy()
    }

    /// Current state of the memory session
    pub fn memory_status(&self) -> SessionStatus {
        self.memory_in_flight
            .lock()
            .as_ref()
            .map(|flight| flight.status)
            .unwrap_or(SessionStatus::Idle)
    }

    /// Validate and claim the memory session for a new capture
    fn claim_memory_session(&self) -> Result<(SessionClaim, watch::Receiver<bool>)> {
        if !self.mem_enabled() {
            return Err(ProfilerError::CapabilityDisabled(ArtifactKind::Memory));
        }

        let state = Arc::clone(&self.memory).try_lock_owned().map_err(|_| {
            warn!("Memory capture already in flight");
            ProfilerError::AlreadyActive(ArtifactKind::Memory)
        })?;

        if !matches!(*state, MemorySession::Idle) {
            return Err(ProfilerError::AlreadyActive(ArtifactKind::Memory));
        }

        let capture_id = self.next_capture_id.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        *self.memory_in_flight.lock() = Some(MemoryInFlight {
            capture_id,
            status: SessionStatus::Idle,
            cancel: Some(cancel_tx),
        });

        let mut claim = SessionClaim {
            capture_id,
            in_flight: Arc::clone(&self.memory_in_flight),
            state,
        };
        claim.transition(MemorySession::Waiting {
            capture_id,
            requested_at: Instant::now(),
        });

        Ok((claim, cancel_rx))
    }

    async fn run_memory_capture(
        &self,
        mut claim: SessionClaim,
        duration: Duration,
        warmup_delay: Duration,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<MemoryCaptureReport> {
        if !claim.is_waiting() {
            return Err(ProfilerError::AlreadyActive(ArtifactKind::Memory));
        }

        if wait_or_cancel(warmup_delay, &mut cancel).await {
            return Err(ProfilerError::Cancelled(ArtifactKind::Memory));
        }

        let output_dir = {
            let config = self.config.read();
            if !config.mem_enabled() {
                return Err(ProfilerError::CapabilityDisabled(ArtifactKind::Memory));
            }
            config.output_dir().to_path_buf()
        };

        let mut artifact = Artifact::create(&output_dir, ArtifactKind::Memory)?;
        let created_at = Instant::now();
        info!(path = %artifact.path().display(), "Memory capture started");

        claim.transition(MemorySession::Active {
            capture_id: claim.capture_id,
            path: artifact.path().to_path_buf(),
            created_at,
        });

        let snapshot = match self.heap.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                artifact.discard();
                return Err(ProfilerError::SnapshotFailed(e.to_string()));
            }
        };

        if let Err(e) = artifact.write_profile(&snapshot) {
            artifact.discard();
            return Err(e);
        }

        let stopped_early = wait_or_cancel(duration, &mut cancel).await;
        let snapshot_bytes = artifact.bytes_written();
        let path = artifact.close()?;
        let closed_at = Instant::now();

        info!(
            path = %path.display(),
            bytes = snapshot_bytes,
            stopped_early,
            "Memory capture finished"
        );

        Ok(MemoryCaptureReport {
            path,
            snapshot_bytes,
            created_at,
            closed_at,
            stopped_early,
        })
    }
}
