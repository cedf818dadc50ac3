//! Profiler implementation
//!
//! Holds the capability flags and the three independently locked concerns:
//! configuration, the CPU session, and the memory session.

use debug_server::{DebugServer, DebugServerConfig, DebugServerHandle};
use parking_lot::{Mutex, RwLock};
use profiler_runtime::{default_heap_snapshotter, CpuSampler, HeapSnapshotter, PprofCpuSampler};
use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ProfilerConfig;
use crate::cpu_session::CpuSession;
use crate::interrupt::{ShutdownNotifier, SignalNotifier};
use crate::memory_session::{MemoryInFlight, MemorySession};

/// Process-wide profiler
///
/// Cloning is cheap and every clone drives the same sessions; hold one per
/// process.
///
/// # Example
///
/// ```no_run
/// use profiler_sessions::{InterruptOptions, Profiler};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let profiler = Profiler::new();
///     profiler.expose_debug_endpoints("127.0.0.1:6060").await?;
///
///     profiler.start_cpu_capture()?;
///     profiler.on_interrupt(InterruptOptions::default());
///
///     profiler.start_memory_capture(Duration::from_secs(10), Duration::from_secs(5))?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Profiler {
    /// Capability flags and output settings
    pub(crate) config: Arc<RwLock<ProfilerConfig>>,
    /// CPU capture session state
    pub(crate) cpu: Arc<Mutex<CpuSession>>,
    /// Memory capture session state, held across the capture routine's waits
    pub(crate) memory: Arc<tokio::sync::Mutex<MemorySession>>,
    /// Status and stop switch of the in-flight memory capture
    pub(crate) memory_in_flight: Arc<Mutex<Option<MemoryInFlight>>>,
    /// Identifies memory captures so the routine can re-validate its claim
    pub(crate) next_capture_id: Arc<AtomicU64>,
    pub(crate) cpu_sampler: Arc<dyn CpuSampler>,
    pub(crate) heap: Arc<dyn HeapSnapshotter>,
    pub(crate) notifier: Arc<dyn ShutdownNotifier>,
}

impl Profiler {
    /// Create a profiler with CPU and memory capture enabled
    ///
    /// Has no side effects: no files are created and no sampler is attached.
    pub fn new() -> Self {
        Self::with_config(ProfilerConfig::default())
    }

    /// Create a profiler over the runtime backends with a custom configuration
    pub fn with_config(config: ProfilerConfig) -> Self {
        let sampler = Arc::new(PprofCpuSampler::new(config.sampling_frequency()));
        Self::with_backends(
            config,
            sampler,
            default_heap_snapshotter(),
            Arc::new(SignalNotifier),
        )
    }

    /// Create a profiler over explicit collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - Capability flags and output directory
    /// * `cpu_sampler` - Process-wide CPU sampler
    /// * `heap` - Heap snapshot source
    /// * `notifier` - Fires when the process is asked to shut down
    pub fn with_backends(
        config: ProfilerConfig,
        cpu_sampler: Arc<dyn CpuSampler>,
        heap: Arc<dyn HeapSnapshotter>,
        notifier: Arc<dyn ShutdownNotifier>,
    ) -> Self {
        debug!("Creating Profiler with config: {:?}", config);

        Self {
            config: Arc::new(RwLock::new(config)),
            cpu: Arc::new(Mutex::new(CpuSession::Idle)),
            memory: Arc::new(tokio::sync::Mutex::new(MemorySession::Idle)),
            memory_in_flight: Arc::new(Mutex::new(None)),
            next_capture_id: Arc::new(AtomicU64::new(1)),
            cpu_sampler,
            heap,
            notifier,
        }
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> ProfilerConfig {
        self.config.read().clone()
    }

    /// Permit or forbid CPU captures
    pub fn set_cpu_enabled(&self, enabled: bool) {
        debug!(enabled, "Setting CPU profiling capability");
        self.config.write().set_cpu_enabled(enabled);
    }

    /// Permit or forbid memory captures
    pub fn set_mem_enabled(&self, enabled: bool) {
        debug!(enabled, "Setting memory profiling capability");
        self.config.write().set_mem_enabled(enabled);
    }

    /// Whether CPU captures are permitted
    pub fn cpu_enabled(&self) -> bool {
        self.config.read().cpu_enabled()
    }

    /// Whether memory captures are permitted
    pub fn mem_enabled(&self) -> bool {
        self.config.read().mem_enabled()
    }

    /// Serve the `/debug/profiling/` endpoints at `address`
    ///
    /// The listener runs on its own task. A bind failure is logged and
    /// returned; it never terminates the process. Calling this twice for the
    /// same address fails with the second bind.
    pub async fn expose_debug_endpoints(
        &self,
        address: &str,
    ) -> debug_server::Result<DebugServerHandle> {
        self.expose_debug_endpoints_with(DebugServerConfig::new(address))
            .await
    }

    /// Serve the debug endpoints with a full server configuration
    pub async fn expose_debug_endpoints_with(
        &self,
        config: DebugServerConfig,
    ) -> debug_server::Result<DebugServerHandle> {
        let server = DebugServer::new(
            config,
            Arc::clone(&self.cpu_sampler),
            Arc::clone(&self.heap),
        );
        let handle = server.start().await?;
        info!(address = %handle.local_addr(), "Profiling web exposition enabled");
        Ok(handle)
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler")
            .field("config", &*self.config.read())
            .field("cpu_sampler", &self.cpu_sampler)
            .field("heap", &self.heap)
            .finish_non_exhaustive()
    }
}
