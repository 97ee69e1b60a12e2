//! Read-only filesystem port used by the scanner and the reconciler.
//!
//! Implementations:
//! - [`DirFs`] - a directory on disk, addressed with root-relative slash paths
//! - [`MemFs`] - an in-memory tree for tests and virtual modules
//!
//! Listings are always returned in byte-wise name order so scans are
//! deterministic regardless of the backing store.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::error::{ModelError, Result};
use crate::validation::{clean_path, split_path};

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Abstract read interface over a module tree.
///
/// Paths are slash-separated and relative to the filesystem root; `.` is the
/// root itself.
pub trait SourceFs {
    /// Open a file for reading.
    ///
    /// Fails with [`ModelError::NotFound`] when the file does not exist.
    fn open(&self, path: &str) -> Result<Box<dyn BufRead + '_>>;

    /// List the immediate entries of a directory, sorted by name.
    ///
    /// Fails with [`ModelError::NotFound`] when the directory does not exist
    /// and [`ModelError::NotADirectory`] when `path` is a regular file.
    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// Read a whole file into memory.
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let mut reader = self.open(path)?;
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| ModelError::from_io(path, e))?;
        Ok(buf)
    }
}

impl<T: SourceFs + ?Sized> SourceFs for &T {
    fn open(&self, path: &str) -> Result<Box<dyn BufRead + '_>> {
        (**self).open(path)
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        (**self).read_dir(path)
    }
}

/// Filesystem rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a relative slash path onto the disk, refusing escapes from the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let cleaned = clean_path(path);
        if cleaned.starts_with('/') || cleaned == ".." || cleaned.starts_with("../") {
            return Err(ModelError::Io {
                path: path.to_string(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "path escapes filesystem root",
                ),
            });
        }
        if cleaned == "." {
            return Ok(self.root.clone());
        }
        Ok(self.root.join(cleaned))
    }
}

impl SourceFs for DirFs {
    fn open(&self, path: &str) -> Result<Box<dyn BufRead + '_>> {
        let full = self.resolve(path)?;
        let file = File::open(&full).map_err(|e| ModelError::from_io(path, e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let full = self.resolve(path)?;
        let meta = std::fs::metadata(&full).map_err(|e| ModelError::from_io(path, e))?;
        if !meta.is_dir() {
            return Err(ModelError::NotADirectory {
                path: path.to_string(),
            });
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&full).map_err(|e| ModelError::from_io(path, e))? {
            let entry = entry.map_err(|e| ModelError::from_io(path, e))?;
            let file_type = entry.file_type().map_err(|e| ModelError::from_io(path, e))?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!(dir = path, name = ?raw, "skipping entry with non UTF-8 name");
                    continue;
                }
            };
            entries.push(DirEntry {
                name,
                is_dir: file_type.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// In-memory filesystem.
///
/// Parent directories are created implicitly when files are added.
#[derive(Debug, Clone)]
pub struct MemFs {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MemFs {
    pub fn new() -> Self {
        let mut dirs = BTreeSet::new();
        dirs.insert(".".to_string());
        Self {
            files: BTreeMap::new(),
            dirs,
        }
    }

    /// Add (or replace) a file, creating its parent directories.
    pub fn add_file(&mut self, path: &str, contents: impl Into<Vec<u8>>) -> &mut Self {
        let path = clean_path(path);
        let (parent, _) = split_path(&path);
        self.add_dir(&parent);
        self.files.insert(path, contents.into());
        self
    }

    /// Add a directory and all of its ancestors.
    pub fn add_dir(&mut self, path: &str) -> &mut Self {
        let mut current = clean_path(path);
        while current != "." && self.dirs.insert(current.clone()) {
            current = split_path(&current).0;
        }
        self
    }

    /// Remove a file, or a directory together with everything below it.
    pub fn remove(&mut self, path: &str) -> &mut Self {
        let path = clean_path(path);
        let prefix = format!("{}/", path);
        self.files
            .retain(|p, _| p != &path && !p.starts_with(&prefix));
        self.dirs.retain(|p| p != &path && !p.starts_with(&prefix));
        self
    }

    fn is_child_of(path: &str, dir: &str) -> bool {
        path != "." && split_path(path).0 == dir
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceFs for MemFs {
    fn open(&self, path: &str) -> Result<Box<dyn BufRead + '_>> {
        let key = clean_path(path);
        match self.files.get(&key) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            None if self.dirs.contains(&key) => Err(ModelError::Io {
                path: path.to_string(),
                source: io::Error::new(io::ErrorKind::Other, "is a directory"),
            }),
            None => Err(ModelError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let key = clean_path(path);
        if !self.dirs.contains(&key) {
            if self.files.contains_key(&key) {
                return Err(ModelError::NotADirectory {
                    path: path.to_string(),
                });
            }
            return Err(ModelError::NotFound {
                path: path.to_string(),
            });
        }

        let mut entries: Vec<DirEntry> = self
            .dirs
            .iter()
            .filter(|d| Self::is_child_of(d, &key))
            .map(|d| DirEntry::dir(split_path(d).1))
            .chain(
                self.files
                    .keys()
                    .filter(|f| Self::is_child_of(f, &key))
                    .map(|f| DirEntry::file(split_path(f).1)),
            )
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
