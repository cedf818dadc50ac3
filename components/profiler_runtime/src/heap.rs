//! Heap snapshot implementation
//!
//! Heap snapshots come from jemalloc's built-in profiler. The host process must
//! use jemalloc as its global allocator and export a `malloc_conf` with
//! `prof:true` for snapshots to be available; otherwise every request reports
//! [`RuntimeError::HeapProfilingUnavailable`].

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, RuntimeError};

/// Source of heap snapshots for the running process
#[async_trait]
pub trait HeapSnapshotter: Send + Sync + fmt::Debug {
    /// Take one snapshot of live allocation sites, encoded as pprof protobuf
    async fn snapshot(&self) -> Result<Vec<u8>>;

    /// Whether snapshots can currently be taken
    async fn is_available(&self) -> bool;
}

/// jemalloc-backed heap snapshotter
#[cfg(all(feature = "jemalloc", target_os = "linux"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct JemallocHeapSnapshotter;

#[cfg(all(feature = "jemalloc", target_os = "linux"))]
#[async_trait]
impl HeapSnapshotter for JemallocHeapSnapshotter {
    async fn snapshot(&self) -> Result<Vec<u8>> {
        let mut prof_ctl = jemalloc_pprof::PROF_CTL
            .as_ref()
            .ok_or_else(|| {
                RuntimeError::HeapProfilingUnavailable(
                    "jemalloc profiling is not available".to_string(),
                )
            })?
            .lock()
            .await;

        if !prof_ctl.activated() {
            return Err(RuntimeError::HeapProfilingUnavailable(
                "jemalloc profiling is not activated".to_string(),
            ));
        }

        prof_ctl
            .dump_pprof()
            .map_err(|e| RuntimeError::Snapshot(e.to_string()))
    }

    async fn is_available(&self) -> bool {
        match jemalloc_pprof::PROF_CTL.as_ref() {
            Some(prof_ctl) => prof_ctl.lock().await.activated(),
            None => false,
        }
    }
}

/// Snapshotter used when no heap profiler is compiled in
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableHeapSnapshotter;

#[async_trait]
impl HeapSnapshotter for UnavailableHeapSnapshotter {
    async fn snapshot(&self) -> Result<Vec<u8>> {
        Err(RuntimeError::HeapProfilingUnavailable(
            "no heap profiler compiled in".to_string(),
        ))
    }

    async fn is_available(&self) -> bool {
        false
    }
}

/// Best heap snapshotter for this build
pub fn default_heap_snapshotter() -> Arc<dyn HeapSnapshotter> {
    #[cfg(all(feature = "jemalloc", target_os = "linux"))]
    {
        Arc::new(JemallocHeapSnapshotter)
    }

    #[cfg(not(all(feature = "jemalloc", target_os = "linux")))]
    {
        Arc::new(UnavailableHeapSnapshotter)
    }
}
