//! Watcher and pipeline tests against a real temporary directory.
//!
//! Timeouts are generous; they bound failures, not the expected latency.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use goview::{
    run_watch_pipeline, ChangeEvent, IgnoreMatcher, ReloadStrategy, RecursiveWatcher,
    WatchOp, WatchPipelineConfig, WatcherConfig,
};
use tempfile::TempDir;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

fn canonical_tempdir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = std::fs::canonicalize(temp_dir.path()).unwrap();
    (temp_dir, root)
}

fn config(root: &Path, debounce_ms: u64) -> WatcherConfig {
    WatcherConfig {
        root_path: root.to_path_buf(),
        debounce_ms,
        gitignore_aware: true,
    }
}

/// Receive until an event for `path` arrives.
async fn wait_for(rx: &mut mpsc::Receiver<ChangeEvent>, path: &Path) -> ChangeEvent {
    timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Some(event) if event.path == path => return event,
                Some(_) => continue,
                None => panic!("event stream closed before {}", path.display()),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

#[test]
fn test_initial_watch_set_skips_ignored_directories() {
    let (_temp_dir, root) = canonical_tempdir();
    for dir in ["pkg/sub", "node_modules/dep", ".git/refs"] {
        std::fs::create_dir_all(root.join(dir)).unwrap();
    }

    let ignores = IgnoreMatcher::for_root(&root, true, &[] as &[&str]).unwrap();
    let watcher = RecursiveWatcher::new(&config(&root, 50), ignores).unwrap();

    assert_eq!(watcher.root(), root.as_path());
    assert_eq!(
        watcher.watched_dirs(),
        vec![root.clone(), root.join("pkg"), root.join("pkg/sub")]
    );
}

#[test]
fn test_missing_root_is_an_error() {
    let (_temp_dir, root) = canonical_tempdir();
    let result = RecursiveWatcher::new(&config(&root.join("missing"), 50), IgnoreMatcher::empty());
    assert!(matches!(result, Err(e) if e.is_not_found()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_new_directories_are_watched() {
    let (_temp_dir, root) = canonical_tempdir();
    let watcher = RecursiveWatcher::new(&config(&root, 20), IgnoreMatcher::empty()).unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut rx = watcher.events(shutdown_rx);

    let dir = root.join("pkg");
    std::fs::create_dir(&dir).unwrap();
    let created = wait_for(&mut rx, &dir).await;
    assert_eq!(created.op, WatchOp::Create);

    // Only visible if the new directory was registered
    let file = dir.join("a.go");
    std::fs::write(&file, "package pkg\n").unwrap();
    wait_for(&mut rx, &file).await;

    shutdown_tx.send(true).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_moved_in_tree_is_watched_throughout() {
    let (_temp_dir, root) = canonical_tempdir();
    let (_staging_dir, staging) = canonical_tempdir();
    std::fs::create_dir_all(staging.join("a/b/c")).unwrap();

    let watcher = RecursiveWatcher::new(&config(&root, 20), IgnoreMatcher::empty()).unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut rx = watcher.events(shutdown_rx);

    // Arrives already populated, so no event ever names a/b or a/b/c
    let moved = root.join("a");
    std::fs::rename(staging.join("a"), &moved).unwrap();
    let created = wait_for(&mut rx, &moved).await;
    assert_eq!(created.op, WatchOp::Create);

    // Only visible if the deepest directory was registered
    let file = moved.join("b/c/x.go");
    std::fs::write(&file, "package c\n").unwrap();
    wait_for(&mut rx, &file).await;

    shutdown_tx.send(true).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_flushes_pending_events() {
    let (_temp_dir, root) = canonical_tempdir();
    // Window far longer than the test so nothing expires on its own
    let watcher = RecursiveWatcher::new(&config(&root, 60_000), IgnoreMatcher::empty()).unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut rx = watcher.events(shutdown_rx);

    let file = root.join("pending.go");
    std::fs::write(&file, "package pending\n").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown_tx.send(true).unwrap();

    let mut flushed = Vec::new();
    timeout(WAIT, async {
        while let Some(event) = rx.recv().await {
            flushed.push(event);
        }
    })
    .await
    .expect("stream did not close after shutdown");

    assert!(flushed.iter().any(|e| e.path == file));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pipeline_applies_changes_until_shutdown() {
    let (_temp_dir, root) = canonical_tempdir();
    std::fs::create_dir_all(root.join("pkg")).unwrap();
    std::fs::write(root.join("go.mod"), "module example.com/live\n\ngo 1.22\n").unwrap();
    std::fs::write(root.join("pkg/pkg.go"), "package pkg\n").unwrap();

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let pipeline = tokio::spawn(run_watch_pipeline(
        WatchPipelineConfig {
            watcher: config(&root, 30),
            strategy: ReloadStrategy::FineGrainedWithFallback,
            ignore_patterns: Vec::new(),
        },
        shutdown_rx,
        move |_module, outcome| sink.lock().unwrap().push(outcome.to_string()),
    ));

    // Initial scan is reported before any event
    timeout(WAIT, async {
        while seen.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(seen.lock().unwrap()[0], "module rebuilt (2 packages)");

    // Give the watcher a moment to register before the first write
    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(
        root.join("pkg/pkg_test.go"),
        "package pkg\n\nimport \"testing\"\n\nfunc TestLive(t *testing.T) {}\n",
    )
    .unwrap();

    timeout(WAIT, async {
        while !seen
            .lock()
            .unwrap()
            .iter()
            .any(|s| s.starts_with("test file pkg/pkg_test.go"))
        {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("test file change never applied");

    shutdown_tx.send(true).unwrap();
    let report = timeout(WAIT, pipeline).await.unwrap().unwrap().unwrap();

    let unit = report.module.unit("pkg/pkg_test.go").unwrap();
    assert_eq!(unit.tests[0].name, "TestLive");
    assert!(report.stats.applied >= 1);
}
