//! Integration tests for profiler_sessions
//!
//! These tests drive the Profiler together with its live debug endpoints over
//! real TCP connections.

use profiler_runtime::{CpuSampler, MockCpuSampler, MockHeapSnapshotter};
use profiler_sessions::{
    ArtifactKind, DebugServerConfig, DebugServerError, InterruptOptions, ManualNotifier,
    Profiler, ProfilerConfig, ProfilerError,
};
use std::sync::Arc;
use std::time::Duration;

fn mock_profiler(config: ProfilerConfig) -> (Profiler, Arc<MockCpuSampler>, Arc<ManualNotifier>) {
    let cpu = Arc::new(MockCpuSampler::new());
    let notifier = Arc::new(ManualNotifier::new());
    let profiler = Profiler::with_backends(
        config,
        cpu.clone(),
        Arc::new(MockHeapSnapshotter::new()),
        notifier.clone(),
    );
    (profiler, cpu, notifier)
}

#[tokio::test]
async fn test_cpu_only_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let (profiler, cpu, _) = mock_profiler(
        ProfilerConfig::builder()
            .mem_enabled(false)
            .output_dir(dir.path())
            .build(),
    );

    let handle = profiler.start_cpu_capture().unwrap();
    assert!(handle.path().starts_with(dir.path()));
    assert!(cpu.is_running());

    let err = profiler
        .start_memory_capture(Duration::from_secs(1), Duration::ZERO)
        .unwrap_err();
    assert!(matches!(
        err,
        ProfilerError::CapabilityDisabled(ArtifactKind::Memory)
    ));

    // The CPU session is unaffected by the rejected memory start
    assert!(profiler.is_cpu_capturing());
    assert!(profiler.stop_cpu_capture().is_some());
}

#[tokio::test]
async fn test_endpoints_share_the_sampler() {
    let dir = tempfile::tempdir().unwrap();
    let (profiler, _, _) = mock_profiler(ProfilerConfig::builder().output_dir(dir.path()).build());

    let server = profiler.expose_debug_endpoints("127.0.0.1:0").await.unwrap();
    profiler.start_cpu_capture().unwrap();

    // A live profile request cannot steal the sampler from a disk capture
    let url = format!("{}profile?seconds=1", server.base_url());
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
    assert!(profiler.is_cpu_capturing());

    profiler.stop_cpu_capture().unwrap();
    server.shutdown().await;
}

#[tokio::test]
async fn test_heap_endpoint_serves_snapshot() {
    let (profiler, _, _) = mock_profiler(ProfilerConfig::default());
    let server = profiler
        .expose_debug_endpoints_with(DebugServerConfig::new("127.0.0.1:0"))
        .await
        .unwrap();

    let url = format!("{}heap", server.base_url());
    let body = reqwest::get(&url).await.unwrap().bytes().await.unwrap();
    assert_eq!(&body[..], MockHeapSnapshotter::SNAPSHOT_BYTES);

    server.shutdown().await;
}

#[tokio::test]
async fn test_bind_failure_is_returned() {
    let (profiler, _, _) = mock_profiler(ProfilerConfig::default());
    let first = profiler.expose_debug_endpoints("127.0.0.1:0").await.unwrap();

    let taken = first.local_addr().to_string();
    let err = profiler.expose_debug_endpoints(&taken).await.unwrap_err();
    assert!(matches!(err, DebugServerError::Bind { .. }));

    // The first listener keeps serving
    assert!(!first.is_finished());
    first.shutdown().await;
}

#[tokio::test]
async fn test_interrupt_after_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let (profiler, cpu, notifier) =
        mock_profiler(ProfilerConfig::builder().output_dir(dir.path()).build());
    let server = profiler.expose_debug_endpoints("127.0.0.1:0").await.unwrap();

    let capture = profiler.start_cpu_capture().unwrap();
    let registration = profiler.on_interrupt(InterruptOptions::default()).unwrap();

    notifier.trigger();
    registration.await.unwrap();

    assert!(!cpu.is_running());
    assert_eq!(
        std::fs::read(capture.path()).unwrap(),
        MockCpuSampler::PROFILE_BYTES
    );

    // The sampler is free for live requests again
    let url = format!("{}symbol", server.base_url());
    let body = reqwest::get(&url).await.unwrap().text().await.unwrap();
    assert_eq!(body, "num_symbols: 1\n");

    server.shutdown().await;
}
