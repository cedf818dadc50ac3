//! Runtime profiling backends
//!
//! This module wraps the process-wide profiling facilities the profiler
//! sessions and the debug server rely on.
//!
//! # Features
//!
//! - **CpuSampler**: statistical CPU sampling, backed by `pprof`
//! - **HeapSnapshotter**: heap snapshots, backed by jemalloc's profiler when the
//!   `jemalloc` feature is on and the host runs jemalloc with `prof:true`
//! - **Symbols**: program-counter to symbol name resolution
//! - **Mocks**: in-memory samplers for testing session logic

mod cpu;
mod error;
mod heap;
mod mock;
mod symbol;

pub use cpu::{CpuSampler, PprofCpuSampler, ProfileFormat, DEFAULT_FREQUENCY};
pub use error::{Result, RuntimeError};
pub use heap::{default_heap_snapshotter, HeapSnapshotter, UnavailableHeapSnapshotter};
#[cfg(all(feature = "jemalloc", target_os = "linux"))]
pub use heap::JemallocHeapSnapshotter;
pub use mock::{MockCpuSampler, MockHeapSnapshotter};
pub use symbol::{parse_addresses, resolve_symbol};
