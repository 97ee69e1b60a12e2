//! Watch pipeline for goview
//!
//! Wires debounced watcher events to module reconciliation. The module is
//! owned by the pipeline and updated one event at a time, in arrival order;
//! consumers observe it through a callback after every applied change.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::watch;

use crate::fs::{DirFs, SourceFs};
use crate::model::{build_module, IgnoreMatcher, Module, ReconcileOutcome, ReloadKind, ReloadStrategy};
use crate::validation::relative_to_root;
use crate::watcher::{ChangeEvent, RecursiveWatcher, WatchOp, WatcherConfig};

/// Configuration for [`run_watch_pipeline`].
#[derive(Debug, Clone, Default)]
pub struct WatchPipelineConfig {
    /// Root, debounce and .gitignore settings
    pub watcher: WatcherConfig,
    pub strategy: ReloadStrategy,
    /// Extra ignore patterns applied after the defaults and .gitignore
    pub ignore_patterns: Vec<String>,
}

/// Counters reported when the pipeline stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Events received from the watcher
    pub events: usize,
    /// Events that produced a reconciliation outcome
    pub applied: usize,
    /// Events with no reload meaning (permission changes, paths outside root)
    pub skipped: usize,
    /// Reconciliations that returned an error
    pub failed: usize,
}

/// Final state of a pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    pub module: Module,
    pub stats: PipelineStats,
}

/// Map a watcher operation to a reload kind.
///
/// Permission changes do not alter the model and map to `None`.
pub fn reload_kind(op: WatchOp) -> Option<ReloadKind> {
    match op {
        WatchOp::Write => Some(ReloadKind::Update),
        WatchOp::Remove => Some(ReloadKind::Remove),
        WatchOp::Rename => Some(ReloadKind::Rename),
        WatchOp::Create => Some(ReloadKind::Create),
        WatchOp::Chmod => None,
    }
}

/// Apply one watcher event to `module`.
///
/// # Arguments
/// * `module` - Model to update
/// * `fs` - Filesystem rooted at `root`
/// * `root` - Canonical root the watcher reports paths under
/// * `event` - Debounced change
/// * `strategy` - Whole, fine-grained, or fine-grained with fallback
///
/// # Returns
/// - `Ok(Some(outcome))` when the change was reconciled
/// - `Ok(None)` when the event carries nothing to reconcile
/// - `Err` when reconciliation failed; the module may be partially patched
///   only under the fine-grained strategy
pub fn apply_event(
    module: &mut Module,
    fs: &dyn SourceFs,
    root: &Path,
    event: &ChangeEvent,
    strategy: ReloadStrategy,
) -> crate::error::Result<Option<ReconcileOutcome>> {
    let kind = match reload_kind(event.op) {
        Some(kind) => kind,
        None => return Ok(None),
    };

    let relative = match relative_to_root(&event.path, root) {
        Ok(relative) => relative,
        Err(err) => {
            tracing::warn!(error = %err, "dropping event outside module root");
            return Ok(None);
        }
    };

    module.apply(fs, &relative, kind, strategy).map(Some)
}

/// Scan the module, then keep it in sync until `shutdown` fires.
///
/// # Arguments
/// * `config` - Pipeline configuration
/// * `shutdown` - Set to `true` (or drop the sender) to stop
/// * `on_change` - Called with the module after the initial scan and after
///   every applied change
///
/// # Returns
/// The final module and event counters. Initial scan and watch setup errors
/// are returned; per-event reconciliation errors are logged and counted.
pub async fn run_watch_pipeline<F>(
    config: WatchPipelineConfig,
    shutdown: watch::Receiver<bool>,
    mut on_change: F,
) -> Result<PipelineReport>
where
    F: FnMut(&Module, &ReconcileOutcome),
{
    let root: PathBuf = std::fs::canonicalize(&config.watcher.root_path)
        .with_context(|| format!("cannot resolve root {}", config.watcher.root_path.display()))?;

    let ignores = IgnoreMatcher::for_root(
        &root,
        config.watcher.gitignore_aware,
        &config.ignore_patterns,
    )
    .context("invalid ignore pattern")?;

    let fs = DirFs::new(&root);
    let mut module = build_module(&fs, ".", ignores.clone())
        .with_context(|| format!("initial scan of {} failed", root.display()))?;
    on_change(
        &module,
        &ReconcileOutcome::Rebuilt {
            packages: module.packages.len(),
        },
    );

    let watcher_config = WatcherConfig {
        root_path: root.clone(),
        ..config.watcher.clone()
    };
    let watcher = RecursiveWatcher::new(&watcher_config, ignores).context("cannot start watcher")?;
    let mut events = watcher.events(shutdown);

    let mut stats = PipelineStats::default();
    while let Some(event) = events.recv().await {
        stats.events += 1;
        tracing::debug!(path = %event.path.display(), op = %event.op, "event");

        match apply_event(&mut module, &fs, &root, &event, config.strategy) {
            Ok(Some(outcome)) => {
                stats.applied += 1;
                tracing::info!(op = %event.op, outcome = %outcome, "reconciled");
                on_change(&module, &outcome);
            }
            Ok(None) => stats.skipped += 1,
            Err(err) => {
                stats.failed += 1;
                tracing::warn!(path = %event.path.display(), error = %err, "reconcile failed");
            }
        }
    }

    tracing::info!(
        events = stats.events,
        applied = stats.applied,
        failed = stats.failed,
        "watch pipeline stopped"
    );
    Ok(PipelineReport { module, stats })
}
