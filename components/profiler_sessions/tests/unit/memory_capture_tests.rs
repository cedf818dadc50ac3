use crate::{artifacts, Fixture};
use profiler_runtime::MockHeapSnapshotter;
use profiler_types::{ArtifactKind, ProfilerError, SessionStatus};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_artifact_respects_warmup_and_window() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());
    let warmup = Duration::from_secs(5);
    let window = Duration::from_secs(10);

    let handle = fx.profiler.start_memory_capture(window, warmup).unwrap();
    let requested_at = handle.requested_at();

    let report = handle.completed().await.unwrap();
    assert!(report.created_at().duration_since(requested_at) >= warmup);
    assert!(report.held_for() >= window);
    assert_eq!(report.snapshot_bytes(), MockHeapSnapshotter::SNAPSHOT_BYTES.len() as u64);

    let name = report.path().file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("mem.pprof."));
    assert!(name.ends_with(".out"));
}

#[tokio::test(start_paused = true)]
async fn test_no_artifact_before_warmup_elapses() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    let handle = fx
        .profiler
        .start_memory_capture(Duration::from_secs(1), Duration::from_secs(30))
        .unwrap();

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(artifacts(dir.path()).is_empty());
    assert_eq!(fx.profiler.memory_status(), SessionStatus::Waiting);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(artifacts(dir.path()).len(), 1);

    handle.completed().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_second_start_while_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    let first = fx
        .profiler
        .start_memory_capture(Duration::from_secs(10), Duration::from_secs(1))
        .unwrap();

    // Rejected during the warmup
    let err = fx
        .profiler
        .start_memory_capture(Duration::from_secs(10), Duration::ZERO)
        .unwrap_err();
    assert!(matches!(err, ProfilerError::AlreadyActive(ArtifactKind::Memory)));

    // And while the artifact is open
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(fx
        .profiler
        .start_memory_capture(Duration::from_secs(10), Duration::ZERO)
        .is_err());
    assert_eq!(artifacts(dir.path()).len(), 1);

    first.completed().await.unwrap();
    assert_eq!(fx.heap.snapshot_count(), 1);

    // Free again once the first capture has closed its artifact
    let next = fx
        .profiler
        .start_memory_capture(Duration::ZERO, Duration::ZERO)
        .unwrap();
    next.completed().await.unwrap();
    assert_eq!(artifacts(dir.path()).len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_starts_never_open_two_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let profiler = fx.profiler.clone();
            tokio::spawn(async move {
                profiler
                    .start_memory_capture(Duration::from_secs(30), Duration::ZERO)
                    .ok()
            })
        })
        .collect();

    let mut handles = Vec::new();
    for attempt in attempts {
        if let Some(handle) = attempt.await.unwrap() {
            handles.push(handle);
        }
    }

    assert_eq!(handles.len(), 1);
    assert!(fx.profiler.stop_memory_capture());
    for handle in handles {
        // Stopping may land during the zero warmup, before any artifact exists
        handle.completed().await;
    }
    assert!(artifacts(dir.path()).len() <= 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_closes_window_early() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    let handle = fx
        .profiler
        .start_memory_capture(Duration::from_secs(600), Duration::ZERO)
        .unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(fx.profiler.is_memory_capturing());
    assert!(fx.profiler.stop_memory_capture());

    let report = handle.completed().await.unwrap();
    assert!(report.stopped_early());
    assert!(report.held_for() < Duration::from_secs(600));
    assert_eq!(
        std::fs::read(report.path()).unwrap(),
        MockHeapSnapshotter::SNAPSHOT_BYTES
    );
    assert!(!fx.profiler.is_memory_capturing());
}

#[tokio::test(start_paused = true)]
async fn test_inline_capture_cancelled_in_warmup() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    let stopper = {
        let profiler = fx.profiler.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            profiler.stop_memory_capture()
        })
    };

    let err = fx
        .profiler
        .capture_memory_profile(Duration::from_secs(10), Duration::from_secs(60))
        .await
        .unwrap_err();

    assert!(matches!(err, ProfilerError::Cancelled(ArtifactKind::Memory)));
    assert!(stopper.await.unwrap());
    assert!(artifacts(dir.path()).is_empty());
}

#[tokio::test]
async fn test_missing_output_dir_ends_routine_idle() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(&dir.path().join("missing"));

    let handle = fx
        .profiler
        .start_memory_capture(Duration::ZERO, Duration::ZERO)
        .unwrap();

    assert!(handle.completed().await.is_none());
    assert_eq!(fx.profiler.memory_status(), SessionStatus::Idle);
    assert_eq!(fx.heap.snapshot_count(), 0);
}

#[tokio::test]
async fn test_abandoned_inline_capture_releases_session() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        fx.profiler
            .capture_memory_profile(Duration::from_secs(60), Duration::from_secs(60)),
    )
    .await;
    assert!(abandoned.is_err());

    assert!(!fx.profiler.is_memory_capturing());
    assert!(fx
        .profiler
        .start_memory_capture(Duration::ZERO, Duration::ZERO)
        .is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_repeated_stop_reports_capture_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    let handle = fx
        .profiler
        .start_memory_capture(Duration::from_secs(600), Duration::ZERO)
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    // Both calls land while the window is still held open
    assert!(fx.profiler.stop_memory_capture());
    assert!(fx.profiler.stop_memory_capture());

    let report = handle.completed().await.unwrap();
    assert!(report.stopped_early());
    assert_eq!(artifacts(dir.path()).len(), 1);

    // Only once the session is idle again is there nothing to stop
    assert!(!fx.profiler.stop_memory_capture());
}

#[test]
fn test_start_outside_runtime_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(dir.path());

    let err = fx
        .profiler
        .start_memory_capture(Duration::from_secs(10), Duration::ZERO)
        .unwrap_err();

    assert!(matches!(
        err,
        ProfilerError::RuntimeUnavailable(ArtifactKind::Memory)
    ));
    assert_eq!(fx.profiler.memory_status(), SessionStatus::Idle);
    assert!(!fx.profiler.stop_memory_capture());
    assert!(artifacts(dir.path()).is_empty());
    assert_eq!(fx.heap.snapshot_count(), 0);
}
