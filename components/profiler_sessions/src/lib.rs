//! Disk-backed profiling sessions
//!
//! This module provides the Profiler, which coordinates CPU and memory capture
//! sessions, exposes live profiling endpoints, and stops captures on interrupt.
//!
//! # Features
//!
//! - **CPU capture**: start/stop sampling into `cpu.pprof.<unixtime>.out`
//! - **Memory capture**: delayed heap snapshot into `mem.pprof.<unixtime>.out`,
//!   held open for a capture window on a background task
//! - **Interrupt handling**: stop captures when the process is signalled
//! - **Web exposition**: serve `/debug/profiling/` over HTTP

mod config;
mod cpu_session;
mod interrupt;
mod memory_session;
mod profiler;

pub use config::{ProfilerConfig, ProfilerConfigBuilder};
pub use cpu_session::CpuCaptureHandle;
pub use interrupt::{InterruptOptions, ManualNotifier, ShutdownNotifier, SignalNotifier};
pub use memory_session::{MemoryCaptureHandle, MemoryCaptureReport};
pub use profiler::Profiler;

// Re-export for convenience
pub use debug_server::{DebugServerConfig, DebugServerError, DebugServerHandle};
pub use profiler_types::{ArtifactKind, ProfilerError, Result, SessionStatus};
