//! goview: a live, in-memory model of a Go module
//!
//! goview scans a Go module into a flat list of packages, each with its
//! files and the tests, examples and benchmarks declared in its test files.
//! A recursive watcher then keeps that model current, either by patching the
//! affected package or by rebuilding the whole module.
//!
//! # Layers
//!
//! - [`ingest`]: go.mod and Go source parsing (tree-sitter)
//! - [`model`]: package tree construction and reconciliation
//! - [`watcher`]: recursive, debounced filesystem events
//! - [`indexer`]: the pipeline joining watcher events to the model
//!
//! # Path Conventions
//!
//! Model paths are slash-separated and relative to the module root, with `.`
//! for the root itself. Watcher paths are absolute; [`indexer::apply_event`]
//! converts between the two.

pub mod error;
pub mod fs;
pub mod indexer;
pub mod ingest;
pub mod model;
pub mod output;
pub mod validation;
pub mod version;
pub mod watcher;

pub use error::{ModelError, Result};
pub use fs::{DirEntry, DirFs, MemFs, SourceFs};
pub use indexer::{
    apply_event, reload_kind, run_watch_pipeline, PipelineReport, PipelineStats,
    WatchPipelineConfig,
};
pub use ingest::{
    detect_package_name, parse_manifest, parse_manifest_str, parse_source_unit, Benchmark,
    Dependency, Example, FileKind, Manifest, SourceUnit, Test, Tool,
};
pub use model::{
    build_module, build_tree, scan_package, FileAction, IgnoreMatcher, Module, ModuleSummary,
    PackageAndUnits, PackageNode, PathShape, ReconcileOutcome, ReloadKind, ReloadStrategy,
};
pub use output::OutputFormat;
pub use validation::PathValidationError;
pub use watcher::{
    classify_event, ChangeEvent, KeyedDebouncer, RecursiveWatcher, WatchBackend, WatchOp,
    WatchSet, WatcherConfig,
};
