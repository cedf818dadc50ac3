//! In-process profiling for CortenBrowser
//!
//! Captures CPU and heap profiles of the running process to disk and serves
//! live profiling data over HTTP. This crate re-exports the public surface of
//! the profiler components.
//!
//! # Example
//!
//! ```no_run
//! use corten_profiler::{InterruptOptions, Profiler};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let profiler = Profiler::new();
//!
//!     // Live endpoints under http://127.0.0.1:6060/debug/profiling/
//!     let server = profiler.expose_debug_endpoints("127.0.0.1:6060").await?;
//!
//!     // CPU profile until ctrl-c
//!     profiler.start_cpu_capture()?;
//!     profiler.on_interrupt(InterruptOptions::default());
//!
//!     // One heap snapshot after a minute of warmup
//!     let capture = profiler.start_memory_capture(
//!         Duration::from_secs(30),
//!         Duration::from_secs(60),
//!     )?;
//!     if let Some(report) = capture.completed().await {
//!         println!("heap profile written to {}", report.path().display());
//!     }
//!
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub use profiler_sessions::{
    CpuCaptureHandle, InterruptOptions, ManualNotifier, MemoryCaptureHandle,
    MemoryCaptureReport, Profiler, ProfilerConfig, ProfilerConfigBuilder, ShutdownNotifier,
    SignalNotifier,
};

pub use profiler_types::{artifact_file_name, ArtifactKind, ProfilerError, Result, SessionStatus};

/// HTTP exposition of live profiling data
pub mod server {
    pub use debug_server::{
        router, DebugServer, DebugServerConfig, DebugServerError, DebugServerHandle, DebugState,
        ROUTE_PREFIX,
    };
}

/// Runtime sampler and heap snapshot backends
pub mod runtime {
    pub use profiler_runtime::{
        default_heap_snapshotter, CpuSampler, HeapSnapshotter, MockCpuSampler,
        MockHeapSnapshotter, PprofCpuSampler, ProfileFormat, RuntimeError,
        UnavailableHeapSnapshotter, DEFAULT_FREQUENCY,
    };

    #[cfg(target_os = "linux")]
    pub use profiler_runtime::JemallocHeapSnapshotter;
}
