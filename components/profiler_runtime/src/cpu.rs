//! CPU sampler implementation
//!
//! Wraps the `pprof` signal-based sampler. Only one sampler can be attached to
//! the process at a time; a second start is rejected by `pprof` itself.

use parking_lot::Mutex;
use pprof::protos::Message;
use pprof::{ProfilerGuard, ProfilerGuardBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{Result, RuntimeError};

/// Default sampling frequency in Hz
pub const DEFAULT_FREQUENCY: i32 = 100;

/// Frames excluded from every profile
const DEFAULT_BLOCKLIST: &[&str] = &["libc", "libgcc", "pthread", "vdso"];

/// Encoding produced when a sampling session stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileFormat {
    /// pprof protobuf, readable by `go tool pprof` and friends
    Pprof,
    /// Flamegraph rendered as SVG
    Flamegraph,
}

/// Process-wide CPU sampling profiler
pub trait CpuSampler: Send + Sync + fmt::Debug {
    /// Begin collecting call-stack samples
    fn start(&self) -> Result<()>;

    /// Stop sampling and encode what was collected
    fn stop(&self, format: ProfileFormat) -> Result<Vec<u8>>;

    /// Whether a sampling session is attached
    fn is_running(&self) -> bool;
}

/// `pprof`-backed CPU sampler
pub struct PprofCpuSampler {
    frequency: i32,
    blocklist: Vec<String>,
    guard: Mutex<Option<ProfilerGuard<'static>>>,
}

impl PprofCpuSampler {
    /// Create a sampler running at `frequency` Hz
    pub fn new(frequency: i32) -> Self {
        Self {
            frequency,
            blocklist: DEFAULT_BLOCKLIST.iter().map(|s| s.to_string()).collect(),
            guard: Mutex::new(None),
        }
    }

    /// Replace the list of library names excluded from samples
    pub fn with_blocklist(mut self, blocklist: Vec<String>) -> Self {
        self.blocklist = blocklist;
        self
    }

    /// Sampling frequency in Hz
    pub fn frequency(&self) -> i32 {
        self.frequency
    }
}

impl Default for PprofCpuSampler {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY)
    }
}

impl fmt::Debug for PprofCpuSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PprofCpuSampler")
            .field("frequency", &self.frequency)
            .field("blocklist", &self.blocklist)
            .field("running", &self.is_running())
            .finish()
    }
}

impl CpuSampler for PprofCpuSampler {
    fn start(&self) -> Result<()> {
        // pprof divides by the frequency after marking itself running, so a
        // bad value would wedge the process-wide profiler
        if self.frequency <= 0 {
            return Err(RuntimeError::InvalidFrequency(self.frequency));
        }

        let mut slot = self.guard.lock();
        if slot.is_some() {
            return Err(RuntimeError::SamplerBusy);
        }

        let guard = ProfilerGuardBuilder::default()
            .frequency(self.frequency)
            .blocklist(&self.blocklist)
            .build()
            .map_err(|e| RuntimeError::Sampler(e.to_string()))?;

        debug!(frequency = self.frequency, "CPU sampler started");
        *slot = Some(guard);
        Ok(())
    }

    fn stop(&self, format: ProfileFormat) -> Result<Vec<u8>> {
        let guard = self
            .guard
            .lock()
            .take()
            .ok_or(RuntimeError::SamplerNotRunning)?;

        let report = guard
            .report()
            .build()
            .map_err(|e| RuntimeError::Sampler(e.to_string()))?;

        // Detach the signal handler before encoding
        drop(guard);
        debug!(?format, "CPU sampler stopped");

        match format {
            ProfileFormat::Pprof => {
                let profile = report
                    .pprof()
                    .map_err(|e| RuntimeError::Sampler(e.to_string()))?;
                Ok(profile.encode_to_vec())
            }
            ProfileFormat::Flamegraph => {
                let mut svg = Vec::new();
                report
                    .flamegraph(&mut svg)
                    .map_err(|e| RuntimeError::Sampler(e.to_string()))?;
                Ok(svg)
            }
        }
    }

    fn is_running(&self) -> bool {
        self.guard.lock().is_some()
    }
}
