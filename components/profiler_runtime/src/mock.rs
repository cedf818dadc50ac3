//! Mock samplers for testing capture sessions
//!
//! These record how often they were driven and can be told to fail, so session
//! logic can be exercised without attaching a real signal-based profiler.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::cpu::{CpuSampler, ProfileFormat};
use crate::error::{Result, RuntimeError};
use crate::heap::HeapSnapshotter;

/// Mock CPU sampler
#[derive(Debug, Default)]
pub struct MockCpuSampler {
    running: AtomicBool,
    fail_start: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl MockCpuSampler {
    /// Bytes every successful stop returns for the pprof format
    pub const PROFILE_BYTES: &'static [u8] = b"mock-cpu-profile";

    /// Bytes every successful stop returns for the flamegraph format
    pub const FLAMEGRAPH_BYTES: &'static [u8] = b"<svg>mock-flamegraph</svg>";

    /// Create an idle mock sampler
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent starts fail as if another sampler were attached
    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Number of successful starts
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of successful stops
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl CpuSampler for MockCpuSampler {
    fn start(&self) -> Result<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(RuntimeError::Sampler(
                "another sampler is attached to this process".to_string(),
            ));
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::SamplerBusy);
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self, format: ProfileFormat) -> Result<Vec<u8>> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(RuntimeError::SamplerNotRunning);
        }
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(match format {
            ProfileFormat::Pprof => Self::PROFILE_BYTES.to_vec(),
            ProfileFormat::Flamegraph => Self::FLAMEGRAPH_BYTES.to_vec(),
        })
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Mock heap snapshotter
#[derive(Debug)]
pub struct MockHeapSnapshotter {
    available: AtomicBool,
    snapshots: AtomicUsize,
}

impl MockHeapSnapshotter {
    /// Bytes every successful snapshot returns
    pub const SNAPSHOT_BYTES: &'static [u8] = b"mock-heap-profile";

    /// Create an available mock snapshotter
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            snapshots: AtomicUsize::new(0),
        }
    }

    /// Toggle whether snapshots succeed
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of snapshots taken
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }
}

impl Default for MockHeapSnapshotter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HeapSnapshotter for MockHeapSnapshotter {
    async fn snapshot(&self) -> Result<Vec<u8>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(RuntimeError::HeapProfilingUnavailable(
                "mock snapshotter disabled".to_string(),
            ));
        }
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        Ok(Self::SNAPSHOT_BYTES.to_vec())
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
