//! In-memory model of a Go module.
//!
//! A [`Module`] is built once by a full scan ([`build_module`]) and then kept
//! current by [`reconcile`], either by patching the affected package node or
//! by rebuilding everything.
//!
//! # Ownership
//!
//! The module owns its package list outright. It has no internal
//! synchronization: exactly one writer applies changes, one at a time, in the
//! order they were observed.

pub mod filter;
pub mod package;
pub mod reconcile;
pub mod scan;

pub use filter::IgnoreMatcher;
pub use package::{scan_package, FileAction, PackageAndUnits, PackageNode};
pub use reconcile::{PathShape, ReconcileOutcome, ReloadKind, ReloadStrategy};
pub use scan::{build_tree, load_unit};

use serde::Serialize;

use crate::error::Result;
use crate::fs::SourceFs;
use crate::ingest::{parse_manifest, Manifest, SourceUnit, MANIFEST_FILE};
use crate::validation::{clean_path, join_path, same_dir, split_path};

/// Scanned module: manifest plus every package below the root.
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    /// `None` when the root has no go.mod
    pub manifest: Option<Manifest>,
    /// Pre-ordered at build time; fine-grained additions are appended
    pub packages: Vec<PackageAndUnits>,
    root: String,
    #[serde(skip)]
    ignores: IgnoreMatcher,
}

/// Equality compares the scanned content and root, not the ignore rules.
impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.manifest == other.manifest && self.packages == other.packages && self.root == other.root
    }
}

impl Eq for Module {}

/// Scan a module rooted at `root`.
///
/// A missing go.mod leaves the manifest empty; any other manifest read
/// failure aborts.
///
/// # Arguments
/// * `fs` - Filesystem holding the module
/// * `root` - Module root inside `fs`, usually `.`
/// * `ignores` - Rules excluding subtrees from the scan
pub fn build_module(fs: &dyn SourceFs, root: &str, ignores: IgnoreMatcher) -> Result<Module> {
    let root = clean_path(root);
    let manifest = read_manifest(fs, &join_path(&root, MANIFEST_FILE))?;
    let packages = build_tree(fs, &root, &ignores)?;

    Ok(Module {
        manifest,
        packages,
        root,
        ignores,
    })
}

fn read_manifest(fs: &dyn SourceFs, path: &str) -> Result<Option<Manifest>> {
    match fs.open(path) {
        Ok(reader) => parse_manifest(reader)
            .map(Some)
            .map_err(|e| e.with_path(path)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

impl Module {
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn ignores(&self) -> &IgnoreMatcher {
        &self.ignores
    }

    /// Path of the manifest file for this module.
    pub fn manifest_path(&self) -> String {
        join_path(&self.root, MANIFEST_FILE)
    }

    pub(crate) fn package_index(&self, directory: &str) -> Option<usize> {
        self.packages
            .iter()
            .position(|p| same_dir(&p.package.directory, directory))
    }

    /// The package scanned from `directory`, if any.
    pub fn package(&self, directory: &str) -> Option<&PackageAndUnits> {
        self.package_index(directory).map(|i| &self.packages[i])
    }

    /// Look up the unit for a test file path.
    pub fn unit(&self, path: &str) -> Option<&SourceUnit> {
        let (dir, name) = split_path(path);
        self.package(&dir).and_then(|p| p.unit(&name))
    }

    /// Totals across all packages.
    pub fn summary(&self) -> ModuleSummary {
        let mut summary = ModuleSummary {
            packages: self.packages.len(),
            ..Default::default()
        };
        for pkg in &self.packages {
            summary.test_files += pkg.package.test_files.len();
            summary.go_files += pkg.package.go_files.len();
            for unit in &pkg.units {
                summary.tests += unit.tests.len();
                summary.examples += unit.examples.len();
                summary.benchmarks += unit.benchmarks.len();
            }
        }
        summary
    }
}

/// Counts reported by `goview scan` and after each reload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModuleSummary {
    pub packages: usize,
    pub test_files: usize,
    pub go_files: usize,
    pub tests: usize,
    pub examples: usize,
    pub benchmarks: usize,
}
