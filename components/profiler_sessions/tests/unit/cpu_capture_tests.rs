use crate::{artifacts, Fixture};
use profiler_runtime::{CpuSampler, MockCpuSampler};
use profiler_sessions::{Profiler, ProfilerConfig};
use profiler_types::{ArtifactKind, ProfilerError, SessionStatus};

#[test]
fn test_second_start_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    let first = fx.profiler.start_cpu_capture().unwrap();
    let err = fx.profiler.start_cpu_capture().unwrap_err();

    assert!(matches!(err, ProfilerError::AlreadyActive(ArtifactKind::Cpu)));
    assert_eq!(artifacts(dir.path()).len(), 1);
    assert_eq!(fx.cpu.start_count(), 1);

    // The first session is unaffected by the rejected start
    assert_eq!(fx.profiler.stop_cpu_capture().as_deref(), Some(first.path()));
}

#[test]
fn test_start_stop_cycles_keep_one_open_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    for cycle in 1..=3 {
        fx.profiler.start_cpu_capture().unwrap();
        assert!(fx.profiler.start_cpu_capture().is_err());
        assert!(fx.profiler.stop_cpu_capture().is_some());
        assert!(fx.profiler.stop_cpu_capture().is_none());

        // Same-second cycles get distinct suffixed names
        assert_eq!(artifacts(dir.path()).len(), cycle);
    }

    assert_eq!(fx.cpu.start_count(), 3);
    assert_eq!(fx.cpu.stop_count(), 3);
    assert!(!fx.cpu.is_running());
}

#[test]
fn test_every_artifact_holds_a_profile() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    fx.profiler.start_cpu_capture().unwrap();
    fx.profiler.stop_cpu_capture().unwrap();
    fx.profiler.start_cpu_capture().unwrap();
    fx.profiler.stop_cpu_capture().unwrap();

    for name in artifacts(dir.path()) {
        assert!(name.starts_with("cpu.pprof."));
        let bytes = std::fs::read(dir.path().join(&name)).unwrap();
        assert_eq!(bytes, MockCpuSampler::PROFILE_BYTES);
    }
}

#[test]
fn test_stop_when_idle_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    assert!(fx.profiler.stop_cpu_capture().is_none());
    assert!(artifacts(dir.path()).is_empty());
    assert_eq!(fx.cpu.stop_count(), 0);
    assert_eq!(fx.profiler.cpu_status(), SessionStatus::Idle);
}

#[test]
fn test_disabled_never_starts_sampler() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::with_config(
        ProfilerConfig::builder()
            .cpu_enabled(false)
            .output_dir(dir.path())
            .build(),
    );

    for _ in 0..3 {
        let err = fx.profiler.start_cpu_capture().unwrap_err();
        assert!(matches!(err, ProfilerError::CapabilityDisabled(ArtifactKind::Cpu)));
    }

    assert_eq!(fx.cpu.start_count(), 0);
    assert!(artifacts(dir.path()).is_empty());
}

#[test]
fn test_disabling_after_construction() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());
    fx.profiler.set_cpu_enabled(false);

    assert!(fx.profiler.start_cpu_capture().is_err());
    assert_eq!(fx.cpu.start_count(), 0);
}

#[test]
fn test_sampler_busy_is_reported_and_rolled_back() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    // Another owner, such as a live HTTP profile request, holds the sampler
    fx.cpu.start().unwrap();

    let err = fx.profiler.start_cpu_capture().unwrap_err();
    assert!(matches!(err, ProfilerError::SamplerStartFailed(_)));
    assert!(artifacts(dir.path()).is_empty());
    assert!(!fx.profiler.is_cpu_capturing());
}

#[test]
fn test_concurrent_starts_open_one_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    let successes: usize = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| fx.profiler.start_cpu_capture().is_ok()))
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().unwrap() as usize)
            .sum()
    });

    assert_eq!(successes, 1);
    assert_eq!(artifacts(dir.path()).len(), 1);
    fx.profiler.stop_cpu_capture().unwrap();
}

#[test]
fn test_zero_sampling_frequency_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let config = ProfilerConfig::builder()
        .output_dir(dir.path())
        .sampling_frequency(0)
        .build();
    // Real sampler: the frequency is rejected before pprof is attached
    let profiler = Profiler::with_config(config);

    for _ in 0..2 {
        let err = profiler.start_cpu_capture().unwrap_err();
        assert!(matches!(err, ProfilerError::SamplerStartFailed(_)));
        assert!(!profiler.is_cpu_capturing());
        assert!(artifacts(dir.path()).is_empty());
    }
    assert!(profiler.stop_cpu_capture().is_none());
}
