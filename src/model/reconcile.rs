//! Apply one filesystem change to a [`Module`].
//!
//! Two modes are offered:
//!
//! - **Whole reload** rescans the module and swaps the result in. It costs a
//!   full tree walk and is always correct.
//! - **Fine-grained reload** dispatches on the shape of the changed path and
//!   patches only what it touches:
//!
//! | Shape                | Action                                              |
//! |----------------------|-----------------------------------------------------|
//! | `go.mod` at the root | re-parse the manifest                               |
//! | `*_test.go`          | re-parse that file, patch its package node and unit |
//! | `*.go`               | add or drop the name in its package node            |
//! | anything else        | rescan the subtree at that path and merge it        |
//!
//! # Known gaps in fine-grained mode
//!
//! - A file event whose parent directory has no package node yet is reported
//!   as [`ReconcileOutcome::Unmatched`] and changes nothing.
//! - Removing a directory drops only the node at that exact path; nodes for
//!   its descendants stay until the next whole reload.
//! - Nodes added by a subtree merge are appended, so the package list is no
//!   longer strictly pre-ordered until the next whole reload.
//!
//! [`ReloadStrategy::FineGrainedWithFallback`] covers the first gap by
//! rebuilding whenever fine-grained mode cannot place a change.
//!
//! # Ignore rules
//!
//! Ignore rules are applied exactly as the scan applies them: only to
//! directories below the module root. A change is skipped when some directory
//! above it is pruned. An ignored directory itself is still listed by its
//! parent but never rescanned. Files are never matched on their own name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::fs::SourceFs;
use crate::ingest::{detect_package_name, parse_manifest, parse_source_unit, MANIFEST_FILE};
use crate::ingest::{SOURCE_EXT, TEST_SUFFIX};
use crate::model::package::{push_unique, remove_name, FileAction};
use crate::model::scan::build_tree;
use crate::model::{build_module, Module};
use crate::validation::{clean_path, join_path, same_dir, split_path};

/// Kind of change being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReloadKind {
    Update,
    Remove,
    Rename,
    Create,
}

impl ReloadKind {
    /// Remove and Rename both mean the path is gone from its old location.
    pub fn is_removal(self) -> bool {
        matches!(self, ReloadKind::Remove | ReloadKind::Rename)
    }
}

impl fmt::Display for ReloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReloadKind::Update => "UPDATE",
            ReloadKind::Remove => "REMOVE",
            ReloadKind::Rename => "RENAME",
            ReloadKind::Create => "CREATE",
        };
        f.write_str(s)
    }
}

/// Routing class of a changed path, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathShape {
    /// The module's go.mod
    Manifest,
    /// `*_test.go`
    TestSource,
    /// Any other `*.go`
    OtherSource,
    /// A directory, a non-source file, or something already gone
    DirectoryOrUnknown,
}

impl PathShape {
    /// Classify `path` for a module rooted at `root`.
    pub fn classify(path: &str, root: &str) -> Self {
        let path = clean_path(path);
        if path == join_path(root, MANIFEST_FILE) {
            PathShape::Manifest
        } else if path.ends_with(TEST_SUFFIX) {
            PathShape::TestSource
        } else if path.ends_with(SOURCE_EXT) {
            PathShape::OtherSource
        } else {
            PathShape::DirectoryOrUnknown
        }
    }
}

/// How changes are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReloadStrategy {
    /// Rebuild the whole module on every change
    Whole,
    /// Patch only the affected part, accepting the known gaps
    FineGrained,
    /// Patch, and rebuild when the patch cannot place the change or fails
    #[default]
    FineGrainedWithFallback,
}

impl ReloadStrategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "whole" | "full" => Some(ReloadStrategy::Whole),
            "fine" | "fine-grained" => Some(ReloadStrategy::FineGrained),
            "fallback" | "fine-with-fallback" => Some(ReloadStrategy::FineGrainedWithFallback),
            _ => None,
        }
    }
}

/// What a single reconciliation did to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReconcileOutcome {
    ManifestReloaded,
    ManifestRemoved,
    TestFile { path: String, action: FileAction },
    SourceFile { path: String, action: FileAction },
    OtherFile { path: String, action: FileAction },
    /// Subtree rescanned; `replaced` nodes overwritten, `added` nodes appended
    SubtreeMerged {
        directory: String,
        replaced: usize,
        added: usize,
    },
    PackageRemoved { directory: String },
    /// No package node exists for the path's directory
    Unmatched { path: String },
    /// Path lies in, or is, a directory the scan prunes
    Ignored { path: String },
    /// Nothing in the model referred to the path
    Unchanged { path: String },
    /// Whole module rebuilt
    Rebuilt { packages: usize },
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::ManifestReloaded => write!(f, "manifest reloaded"),
            ReconcileOutcome::ManifestRemoved => write!(f, "manifest removed"),
            ReconcileOutcome::TestFile { path, action } => write!(f, "test file {} {:?}", path, action),
            ReconcileOutcome::SourceFile { path, action } => {
                write!(f, "source file {} {:?}", path, action)
            }
            ReconcileOutcome::OtherFile { path, action } => write!(f, "file {} {:?}", path, action),
            ReconcileOutcome::SubtreeMerged {
                directory,
                replaced,
                added,
            } => write!(
                f,
                "subtree {} merged (replaced={} added={})",
                directory, replaced, added
            ),
            ReconcileOutcome::PackageRemoved { directory } => {
                write!(f, "package {} removed", directory)
            }
            ReconcileOutcome::Unmatched { path } => write!(f, "no package for {}", path),
            ReconcileOutcome::Ignored { path } => write!(f, "{} ignored", path),
            ReconcileOutcome::Unchanged { path } => write!(f, "{} unchanged", path),
            ReconcileOutcome::Rebuilt { packages } => {
                write!(f, "module rebuilt ({} packages)", packages)
            }
        }
    }
}

impl Module {
    /// Rebuild the whole module from its root and swap it in.
    ///
    /// On error the current model is left as it was.
    pub fn reload(&mut self, fs: &dyn SourceFs) -> Result<ReconcileOutcome> {
        let fresh = build_module(fs, self.root(), self.ignores().clone())?;
        let packages = fresh.packages.len();
        *self = fresh;
        Ok(ReconcileOutcome::Rebuilt { packages })
    }

    /// Apply one change with the given strategy.
    pub fn apply(
        &mut self,
        fs: &dyn SourceFs,
        path: &str,
        kind: ReloadKind,
        strategy: ReloadStrategy,
    ) -> Result<ReconcileOutcome> {
        let path = clean_path(path);
        if self.is_under_ignored_dir(&path) {
            return Ok(ReconcileOutcome::Ignored { path });
        }

        match strategy {
            ReloadStrategy::Whole => self.reload(fs),
            ReloadStrategy::FineGrained => self.fine_grained_reload(fs, &path, kind),
            ReloadStrategy::FineGrainedWithFallback => {
                match self.fine_grained_reload(fs, &path, kind) {
                    Ok(ReconcileOutcome::Unmatched { path }) => {
                        tracing::debug!(path = %path, "no package node, rebuilding module");
                        self.reload(fs)
                    }
                    // A whole reload would trip over the same file
                    Err(e) if e.is_parse() => Err(e),
                    Err(e) => {
                        tracing::warn!(path = %path, error = %e, "fine-grained reload failed, rebuilding module");
                        self.reload(fs)
                    }
                    outcome => outcome,
                }
            }
        }
    }

    /// Patch only the part of the model `path` refers to.
    ///
    /// `path` is relative to the filesystem root, like every model path.
    pub fn fine_grained_reload(
        &mut self,
        fs: &dyn SourceFs,
        path: &str,
        kind: ReloadKind,
    ) -> Result<ReconcileOutcome> {
        let path = clean_path(path);
        if self.is_under_ignored_dir(&path) {
            return Ok(ReconcileOutcome::Ignored { path });
        }

        let shape = PathShape::classify(&path, self.root());
        tracing::debug!(path = %path, kind = %kind, shape = ?shape, "reconciling");

        match shape {
            PathShape::Manifest => self.reload_manifest(fs, &path, kind),
            PathShape::TestSource => self.reload_test_file(fs, &path, kind),
            PathShape::OtherSource => self.reload_source_file(fs, &path, kind),
            PathShape::DirectoryOrUnknown => self.reload_subtree(fs, &path),
        }
    }

    /// Whether a directory between the module root and `path` is pruned.
    ///
    /// The matcher checks parents, so testing the immediate parent covers
    /// every ancestor.
    fn is_under_ignored_dir(&self, path: &str) -> bool {
        let (parent, _) = split_path(path);
        !same_dir(&parent, self.root()) && self.ignores().is_ignored(&parent, true)
    }

    /// Whether `path` is an existing directory the scan would list but not visit.
    fn is_pruned_dir(&self, fs: &dyn SourceFs, path: &str) -> bool {
        !same_dir(path, self.root())
            && self.ignores().is_ignored(path, true)
            && fs.read_dir(path).is_ok()
    }

    fn reload_manifest(
        &mut self,
        fs: &dyn SourceFs,
        path: &str,
        kind: ReloadKind,
    ) -> Result<ReconcileOutcome> {
        match fs.open(path) {
            Ok(reader) => {
                let manifest = parse_manifest(reader).map_err(|e| e.with_path(path))?;
                self.manifest = Some(manifest);
                Ok(ReconcileOutcome::ManifestReloaded)
            }
            Err(e) if kind.is_removal() => {
                tracing::debug!(path = %path, error = %e, "manifest unreadable after removal");
                self.manifest = None;
                Ok(ReconcileOutcome::ManifestRemoved)
            }
            Err(e) => Err(e),
        }
    }

    fn reload_test_file(
        &mut self,
        fs: &dyn SourceFs,
        path: &str,
        kind: ReloadKind,
    ) -> Result<ReconcileOutcome> {
        let (dir, name) = split_path(path);
        let idx = match self.package_index(&dir) {
            Some(idx) => idx,
            None => return Ok(ReconcileOutcome::Unmatched { path: path.to_string() }),
        };

        let removed = |module: &mut Module| ReconcileOutcome::TestFile {
            path: path.to_string(),
            action: module.packages[idx].remove_test_file(&name),
        };

        if kind.is_removal() {
            return Ok(removed(self));
        }

        let source = match fs.read(path) {
            Ok(source) => source,
            Err(e) if e.is_not_found() => return Ok(removed(self)),
            Err(e) => return Err(e),
        };

        // Parse before touching the node so a bad file leaves the model intact
        let mut unit = parse_source_unit(&source).map_err(|e| e.with_path(path))?;
        unit.name = name.clone();
        unit.path = path.to_string();

        let entry = &mut self.packages[idx];
        fill_package_name(&mut entry.package.name, &source, path)?;
        let action = entry.upsert_unit(unit);
        Ok(ReconcileOutcome::TestFile {
            path: path.to_string(),
            action,
        })
    }

    fn reload_source_file(
        &mut self,
        fs: &dyn SourceFs,
        path: &str,
        kind: ReloadKind,
    ) -> Result<ReconcileOutcome> {
        let (dir, name) = split_path(path);
        let idx = match self.package_index(&dir) {
            Some(idx) => idx,
            None => return Ok(ReconcileOutcome::Unmatched { path: path.to_string() }),
        };

        let package = &mut self.packages[idx].package;
        let action = if kind.is_removal() {
            package.remove_file(&name)
        } else {
            match fs.read(path) {
                Ok(source) => {
                    fill_package_name(&mut package.name, &source, path)?;
                    package.add_file(&name)
                }
                Err(e) if e.is_not_found() => package.remove_file(&name),
                Err(e) => return Err(e),
            }
        };

        Ok(ReconcileOutcome::SourceFile {
            path: path.to_string(),
            action,
        })
    }

    /// Rescan the subtree at `path` and merge the result.
    ///
    /// Every rebuilt node overwrites the existing node for the same directory
    /// with the rebuilt content, or is appended when none exists.
    fn reload_subtree(&mut self, fs: &dyn SourceFs, path: &str) -> Result<ReconcileOutcome> {
        if self.is_pruned_dir(fs, path) {
            return Ok(self.record_ignored_directory(path));
        }

        let rebuilt = match build_tree(fs, path, self.ignores()) {
            Ok(rebuilt) => rebuilt,
            Err(ModelError::NotFound { .. }) if fs.read_dir(path).is_err_and(|e| e.is_not_found()) => {
                return Ok(self.remove_subtree_root(path));
            }
            Err(ModelError::NotADirectory { path: p }) if clean_path(&p) == path => {
                return Ok(self.record_other_file(path));
            }
            Err(e) => return Err(e),
        };

        let mut replaced = 0;
        let mut added = 0;
        for node in rebuilt {
            match self.package_index(&node.package.directory) {
                Some(idx) => {
                    self.packages[idx] = node;
                    replaced += 1;
                }
                None => {
                    let (parent, name) = split_path(&node.package.directory);
                    if let Some(parent_idx) = self.package_index(&parent) {
                        let parent = &mut self.packages[parent_idx].package;
                        remove_name(&mut parent.other_files, &name);
                        push_unique(&mut parent.subdirectories, &name);
                    }
                    self.packages.push(node);
                    added += 1;
                }
            }
        }

        Ok(ReconcileOutcome::SubtreeMerged {
            directory: path.to_string(),
            replaced,
            added,
        })
    }

    /// The path vanished: drop the node at exactly that directory and any
    /// mention of it in the parent node.
    fn remove_subtree_root(&mut self, path: &str) -> ReconcileOutcome {
        let (parent, name) = split_path(path);
        let mut listed = false;
        if let Some(parent_idx) = self.package_index(&parent) {
            let parent = &mut self.packages[parent_idx].package;
            listed |= remove_name(&mut parent.subdirectories, &name);
            listed |= remove_name(&mut parent.other_files, &name);
        }

        match self.package_index(path) {
            Some(idx) => {
                self.packages.remove(idx);
                ReconcileOutcome::PackageRemoved {
                    directory: path.to_string(),
                }
            }
            None if listed => ReconcileOutcome::OtherFile {
                path: path.to_string(),
                action: FileAction::Removed,
            },
            None => ReconcileOutcome::Unchanged {
                path: path.to_string(),
            },
        }
    }

    /// The path is an ignored directory: keep the parent's listing current
    /// without looking inside.
    fn record_ignored_directory(&mut self, path: &str) -> ReconcileOutcome {
        let (parent, name) = split_path(path);
        if let Some(parent_idx) = self.package_index(&parent) {
            let parent = &mut self.packages[parent_idx].package;
            if !parent.has_subdirectory(&name) {
                remove_name(&mut parent.other_files, &name);
                parent.subdirectories.push(name);
            }
        }
        ReconcileOutcome::Ignored {
            path: path.to_string(),
        }
    }

    /// The path is a regular file without a source suffix.
    fn record_other_file(&mut self, path: &str) -> ReconcileOutcome {
        let (parent, name) = split_path(path);
        match self.package_index(&parent) {
            Some(idx) => ReconcileOutcome::OtherFile {
                path: path.to_string(),
                action: self.packages[idx].package.add_file(&name),
            },
            None => ReconcileOutcome::Unmatched {
                path: path.to_string(),
            },
        }
    }
}

/// Set a still-undetermined package name from a newly seen source file.
fn fill_package_name(name: &mut String, source: &[u8], path: &str) -> Result<()> {
    if name.is_empty() {
        *name = detect_package_name(source).map_err(|e| ModelError::from_io(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemFs;
    use crate::model::IgnoreMatcher;

    #[test]
    fn test_classify_priority() {
        assert_eq!(PathShape::classify("go.mod", "."), PathShape::Manifest);
        assert_eq!(PathShape::classify("./go.mod", ""), PathShape::Manifest);
        assert_eq!(PathShape::classify("sub/go.mod", "."), PathShape::DirectoryOrUnknown);
        assert_eq!(PathShape::classify("sub/go.mod", "sub"), PathShape::Manifest);
        assert_eq!(PathShape::classify("a/x_test.go", "."), PathShape::TestSource);
        assert_eq!(PathShape::classify("a/x.go", "."), PathShape::OtherSource);
        assert_eq!(PathShape::classify("a/x", "."), PathShape::DirectoryOrUnknown);
        assert_eq!(PathShape::classify("notes.txt", "."), PathShape::DirectoryOrUnknown);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(ReloadStrategy::from_str("whole"), Some(ReloadStrategy::Whole));
        assert_eq!(ReloadStrategy::from_str("FINE"), Some(ReloadStrategy::FineGrained));
        assert_eq!(
            ReloadStrategy::from_str("fallback"),
            Some(ReloadStrategy::FineGrainedWithFallback)
        );
        assert_eq!(ReloadStrategy::from_str("sometimes"), None);
        assert_eq!(ReloadStrategy::default(), ReloadStrategy::FineGrainedWithFallback);
    }

    #[test]
    fn test_removal_kinds() {
        assert!(ReloadKind::Remove.is_removal());
        assert!(ReloadKind::Rename.is_removal());
        assert!(!ReloadKind::Update.is_removal());
        assert!(!ReloadKind::Create.is_removal());
    }

    #[test]
    fn test_non_source_file_lands_in_other_files() {
        let mut fs = MemFs::new();
        fs.add_file("a.go", "package a\n");
        let mut module = build_module(&fs, ".", IgnoreMatcher::empty()).unwrap();

        fs.add_file("NOTES.txt", "hello");
        let outcome = module
            .fine_grained_reload(&fs, "NOTES.txt", ReloadKind::Create)
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::OtherFile {
                path: "NOTES.txt".to_string(),
                action: FileAction::Added
            }
        );
        assert_eq!(module.packages[0].package.other_files, vec!["NOTES.txt".to_string()]);

        fs.remove("NOTES.txt");
        let outcome = module
            .fine_grained_reload(&fs, "NOTES.txt", ReloadKind::Remove)
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::OtherFile {
                path: "NOTES.txt".to_string(),
                action: FileAction::Removed
            }
        );
        assert!(module.packages[0].package.other_files.is_empty());
    }

    #[test]
    fn test_ignored_path_is_skipped() {
        let mut fs = MemFs::new();
        fs.add_file("a.go", "package a\n");
        let ignores = IgnoreMatcher::new(std::path::Path::new("/"), &["vendor"]).unwrap();
        let mut module = build_module(&fs, ".", ignores).unwrap();
        let before = module.clone();

        fs.add_file("vendor/dep/dep.go", "package dep\n");
        let outcome = module
            .apply(&fs, "vendor/dep", ReloadKind::Create, ReloadStrategy::Whole)
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Ignored {
                path: "vendor/dep".to_string()
            }
        );
        assert_eq!(module, before);
    }
}
