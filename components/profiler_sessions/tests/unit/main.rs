//! Unit tests for profiler_sessions component

mod cpu_capture_tests;
mod memory_capture_tests;

use profiler_runtime::{MockCpuSampler, MockHeapSnapshotter};
use profiler_sessions::{ManualNotifier, Profiler, ProfilerConfig};
use std::path::Path;
use std::sync::Arc;

/// Profiler over mock collaborators writing into `dir`
pub struct Fixture {
    pub profiler: Profiler,
    pub cpu: Arc<MockCpuSampler>,
    pub heap: Arc<MockHeapSnapshotter>,
    pub notifier: Arc<ManualNotifier>,
}

impl Fixture {
    pub fn new(dir: &Path) -> Self {
        Self::with_config(ProfilerConfig::builder().output_dir(dir).build())
    }

    pub fn with_config(config: ProfilerConfig) -> Self {
        let cpu = Arc::new(MockCpuSampler::new());
        let heap = Arc::new(MockHeapSnapshotter::new());
        let notifier = Arc::new(ManualNotifier::new());
        let profiler =
            Profiler::with_backends(config, cpu.clone(), heap.clone(), notifier.clone());

        Self {
            profiler,
            cpu,
            heap,
            notifier,
        }
    }
}

/// Names of the files currently in `dir`, sorted
pub fn artifacts(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
