//! Recursive directory watcher with per-key debouncing.
//!
//! The OS backend is driven in non-recursive mode; [`WatchSet`] registers each
//! directory under the root and tracks directories as they come and go.
//! Raw notifications flow from the backend thread into a tokio task, which
//! coalesces them with a [`KeyedDebouncer`] and forwards the result on a
//! bounded channel.
//!
//! # Lifecycle
//!
//! 1. [`RecursiveWatcher::new`] walks the root and registers every
//!    non-ignored directory.
//! 2. [`RecursiveWatcher::events`] spawns the event loop. A created directory
//!    is registered together with whatever it already contains; a removed or
//!    renamed path is unregistered.
//! 3. When the shutdown signal fires, every pending event is flushed, all
//!    watches are released, and the stream closes.
//!
//! Backend errors are logged and never end the stream.

pub mod debounce;
pub mod watch_set;

pub use debounce::KeyedDebouncer;
pub use watch_set::{WatchBackend, WatchSet};

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use crate::error::{ModelError, Result};
use crate::model::IgnoreMatcher;

/// Capacity of the outgoing event channel.
const EVENT_BUFFER: usize = 64;

/// Filesystem watcher configuration
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Directory to watch recursively
    pub root_path: PathBuf,
    /// Debounce window in milliseconds
    pub debounce_ms: u64,
    /// Honour the root's .gitignore (default: true)
    pub gitignore_aware: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("."),
            debounce_ms: 50,
            gitignore_aware: true,
        }
    }
}

/// Operation reported for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WatchOp {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
}

impl fmt::Display for WatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatchOp::Create => "CREATE",
            WatchOp::Write => "WRITE",
            WatchOp::Remove => "REMOVE",
            WatchOp::Rename => "RENAME",
            WatchOp::Chmod => "CHMOD",
        };
        f.write_str(s)
    }
}

/// One coalesced change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Absolute path under the watched root
    pub path: PathBuf,
    pub op: WatchOp,
}

/// Translate a backend event into per-path operations.
///
/// Access notifications carry no change and yield nothing. A rename reported
/// with both ends becomes a Rename of the old path and a Create of the new one.
pub fn classify_event(event: &notify::Event) -> Vec<(PathBuf, WatchOp)> {
    let all = |op: WatchOp| -> Vec<(PathBuf, WatchOp)> {
        event.paths.iter().map(|p| (p.clone(), op)).collect()
    };

    match event.kind {
        EventKind::Create(_) => all(WatchOp::Create),
        EventKind::Remove(_) => all(WatchOp::Remove),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => all(WatchOp::Rename),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => all(WatchOp::Create),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => vec![(from.clone(), WatchOp::Rename), (to.clone(), WatchOp::Create)],
            _ => all(WatchOp::Rename),
        },
        // Backends that cannot tell the two ends apart: whichever path still
        // exists is the new name
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let op = if p.exists() {
                    WatchOp::Create
                } else {
                    WatchOp::Rename
                };
                (p.clone(), op)
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => all(WatchOp::Chmod),
        EventKind::Modify(_) | EventKind::Any => all(WatchOp::Write),
        EventKind::Access(_) | EventKind::Other => Vec::new(),
    }
}

/// Watcher over a whole directory tree.
pub struct RecursiveWatcher {
    watch_set: WatchSet<RecommendedWatcher>,
    raw_rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    debounce: Duration,
}

impl RecursiveWatcher {
    /// Start watching `config.root_path` and everything below it.
    ///
    /// # Arguments
    /// * `config` - Root and debounce settings
    /// * `ignores` - Directories matching these rules are never watched
    ///
    /// # Returns
    /// A watcher with the initial watch set registered. Events are buffered
    /// until [`RecursiveWatcher::events`] is called.
    pub fn new(config: &WatcherConfig, ignores: IgnoreMatcher) -> Result<Self> {
        let root = std::fs::canonicalize(&config.root_path)
            .map_err(|e| ModelError::from_io(config.root_path.display().to_string(), e))?;

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let backend = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            // Receiver gone means the watcher is shutting down
            let _ = raw_tx.send(res);
        })
        .map_err(|source| ModelError::Watch {
            path: root.clone(),
            source,
        })?;

        let mut watch_set = WatchSet::new(backend, root.clone(), ignores);
        let count = watch_set.add_recursive(&root)?;
        tracing::info!(root = %root.display(), directories = count, "watching");

        Ok(Self {
            watch_set,
            raw_rx,
            debounce: Duration::from_millis(config.debounce_ms),
        })
    }

    /// Canonical root of the watched tree.
    pub fn root(&self) -> &Path {
        self.watch_set.root()
    }

    /// Currently watched directories.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.watch_set.dirs()
    }

    /// Spawn the event loop and return the debounced event stream.
    ///
    /// Must be called from within a tokio runtime. The stream ends after the
    /// `shutdown` value becomes `true` (or its sender is dropped) and all
    /// pending events have been delivered.
    pub fn events(self, shutdown: watch::Receiver<bool>) -> mpsc::Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(self.run(shutdown, tx));
        rx
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>, out: mpsc::Sender<ChangeEvent>) {
        let mut debouncer = KeyedDebouncer::new(self.debounce);

        loop {
            let stop = *shutdown.borrow_and_update();
            if stop {
                break;
            }

            let wait = debouncer.sleep_duration_at(std::time::Instant::now());

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        tracing::debug!("shutdown sender dropped");
                        break;
                    }
                }
                raw = self.raw_rx.recv() => match raw {
                    Some(Ok(event)) => self.handle_raw(&event, &mut debouncer),
                    Some(Err(err)) => tracing::warn!(error = %err, "watch backend error"),
                    None => break,
                },
                _ = tokio::time::sleep(wait.unwrap_or_default()), if wait.is_some() => {}
            }

            for event in debouncer.take_expired() {
                if out.send(event).await.is_err() {
                    tracing::debug!("event receiver dropped");
                    self.watch_set.clear();
                    return;
                }
            }
        }

        let pending = debouncer.drain();
        tracing::debug!(count = pending.len(), "flushing pending events");
        for event in pending {
            if out.send(event).await.is_err() {
                break;
            }
        }
        self.watch_set.clear();
    }

    fn handle_raw(&mut self, event: &notify::Event, debouncer: &mut KeyedDebouncer) {
        tracing::trace!(kind = ?event.kind, paths = ?event.paths, "raw event");

        for (path, op) in classify_event(event) {
            match op {
                WatchOp::Create if path.is_dir() => match self.watch_set.add_recursive(&path) {
                    Ok(added) => {
                        tracing::debug!(dir = %path.display(), added, "watching new directory")
                    }
                    Err(err) => {
                        tracing::warn!(dir = %path.display(), error = %err, "cannot watch new directory")
                    }
                },
                WatchOp::Remove | WatchOp::Rename => {
                    self.watch_set.remove(&path);
                }
                _ => {}
            }
            debouncer.add(ChangeEvent { path, op });
        }
    }
}
