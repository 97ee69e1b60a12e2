//! Single-directory scan: the package node and its parsed test units.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::fs::SourceFs;
use crate::ingest::{detect_package_name, FileKind, SourceUnit};
use crate::validation::{clean_path, join_path};

/// Summary of one directory.
///
/// A file name appears in at most one of `test_files`, `go_files` and
/// `other_files`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNode {
    /// Package name from the first source file, empty if undetermined
    pub name: String,
    /// Cleaned directory path, `.` for the root
    pub directory: String,
    pub subdirectories: Vec<String>,
    /// `*_test.go`
    pub test_files: Vec<String>,
    /// Non-test `*.go`
    pub go_files: Vec<String>,
    /// Everything else
    pub other_files: Vec<String>,
}

/// How a reconciliation step changed one file entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileAction {
    Added,
    Updated,
    Removed,
    Unchanged,
}

impl PackageNode {
    /// The list a file of this name belongs in.
    fn list_for(&mut self, name: &str) -> &mut Vec<String> {
        match FileKind::of(name) {
            FileKind::Test => &mut self.test_files,
            FileKind::Source => &mut self.go_files,
            FileKind::Other => &mut self.other_files,
        }
    }

    /// Record a file in the list matching its suffix.
    pub fn add_file(&mut self, name: &str) -> FileAction {
        if push_unique(self.list_for(name), name) {
            FileAction::Added
        } else {
            FileAction::Unchanged
        }
    }

    /// Drop a file from the list matching its suffix.
    pub fn remove_file(&mut self, name: &str) -> FileAction {
        if remove_name(self.list_for(name), name) {
            FileAction::Removed
        } else {
            FileAction::Unchanged
        }
    }

    pub fn has_subdirectory(&self, name: &str) -> bool {
        self.subdirectories.iter().any(|s| s == name)
    }
}

/// A package node together with the units parsed from its test files.
///
/// Units are matched to test files by name, not by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageAndUnits {
    pub package: PackageNode,
    pub units: Vec<SourceUnit>,
}

impl PackageAndUnits {
    pub fn unit(&self, file_name: &str) -> Option<&SourceUnit> {
        self.units.iter().find(|u| u.name == file_name)
    }

    /// Insert a freshly parsed unit, overwriting one with the same name in place.
    pub fn upsert_unit(&mut self, unit: SourceUnit) -> FileAction {
        push_unique(&mut self.package.test_files, &unit.name);
        match self.units.iter_mut().find(|u| u.name == unit.name) {
            Some(existing) => {
                *existing = unit;
                FileAction::Updated
            }
            None => {
                self.units.push(unit);
                FileAction::Added
            }
        }
    }

    /// Remove a test file entry and its unit.
    pub fn remove_test_file(&mut self, file_name: &str) -> FileAction {
        let listed = remove_name(&mut self.package.test_files, file_name);
        let before = self.units.len();
        self.units.retain(|u| u.name != file_name);
        if listed || self.units.len() != before {
            FileAction::Removed
        } else {
            FileAction::Unchanged
        }
    }
}

/// Append `name` unless already present. Returns whether it was added.
pub(crate) fn push_unique(list: &mut Vec<String>, name: &str) -> bool {
    if list.iter().any(|n| n == name) {
        return false;
    }
    list.push(name.to_string());
    true
}

/// Remove every occurrence of `name`. Returns whether anything was removed.
pub(crate) fn remove_name(list: &mut Vec<String>, name: &str) -> bool {
    let before = list.len();
    list.retain(|n| n != name);
    list.len() != before
}

/// Classify the immediate entries of `dir`.
///
/// Subdirectories are listed but not visited. The package name comes from the
/// first source file (test or not) in listing order that has a package line.
///
/// # Errors
/// Listing failures, and open or read failures of a file consulted for the
/// package name.
pub fn scan_package(fs: &dyn SourceFs, dir: &str) -> Result<PackageNode> {
    let directory = clean_path(dir);
    let entries = fs.read_dir(&directory)?;

    let mut node = PackageNode {
        directory,
        ..Default::default()
    };

    for entry in entries {
        if entry.is_dir {
            node.subdirectories.push(entry.name);
            continue;
        }

        let kind = FileKind::of(&entry.name);
        if kind.is_source() && node.name.is_empty() {
            let path = join_path(&node.directory, &entry.name);
            let reader = fs.open(&path)?;
            node.name = detect_package_name(reader).map_err(|e| ModelError::from_io(&path, e))?;
        }
        node.list_for(&entry.name).push(entry.name);
    }

    Ok(node)
}
