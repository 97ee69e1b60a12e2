//! The set of directories currently registered with the watch backend.
//!
//! The backend only watches single directories, so recursion is done here:
//! every non-ignored directory under the root is registered individually, and
//! the set grows and shrinks as directories appear and disappear.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use walkdir::WalkDir;

use crate::error::{ModelError, Result};
use crate::model::IgnoreMatcher;
use crate::validation::relative_to_root;

/// Non-recursive watch registration.
pub trait WatchBackend {
    fn add_watch(&mut self, dir: &Path) -> Result<()>;
    fn remove_watch(&mut self, dir: &Path) -> Result<()>;
}

impl WatchBackend for RecommendedWatcher {
    fn add_watch(&mut self, dir: &Path) -> Result<()> {
        self.watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| ModelError::Watch {
                path: dir.to_path_buf(),
                source,
            })
    }

    fn remove_watch(&mut self, dir: &Path) -> Result<()> {
        self.unwatch(dir).map_err(|source| ModelError::Watch {
            path: dir.to_path_buf(),
            source,
        })
    }
}

/// Watched directories under one root.
pub struct WatchSet<B: WatchBackend> {
    backend: B,
    root: PathBuf,
    ignores: IgnoreMatcher,
    watched: BTreeSet<PathBuf>,
}

impl<B: WatchBackend> WatchSet<B> {
    pub fn new(backend: B, root: PathBuf, ignores: IgnoreMatcher) -> Self {
        Self {
            backend,
            root,
            ignores,
            watched: BTreeSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register `dir` and every non-ignored directory below it.
    ///
    /// Ignored directories are pruned, so nothing beneath them is visited.
    /// Directories already in the set are not registered again. A directory
    /// below `dir` that vanishes mid-walk is skipped; only a failure on `dir`
    /// itself is an error.
    ///
    /// # Returns
    /// Number of newly registered directories
    pub fn add_recursive(&mut self, dir: &Path) -> Result<usize> {
        let root = &self.root;
        let ignores = &self.ignores;
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                !entry.file_type().is_dir() || !is_ignored_dir(root, ignores, entry.path())
            });

        let mut added = 0;
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    let path = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| dir.display().to_string());
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
                    return Err(ModelError::from_io(path, source));
                }
                Err(err) => {
                    // Usually a directory removed while the walk was running
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }
            let depth = entry.depth();
            let path = entry.into_path();
            if self.watched.contains(&path) {
                continue;
            }
            match self.backend.add_watch(&path) {
                Ok(()) => {}
                Err(err) if depth > 0 && err.is_not_found() => {
                    tracing::warn!(dir = %path.display(), error = %err, "directory vanished before it was watched");
                    continue;
                }
                Err(err) => return Err(err),
            }
            tracing::debug!(dir = %path.display(), "watching");
            self.watched.insert(path);
            added += 1;
        }

        Ok(added)
    }

    /// Unregister `dir` if it is watched.
    ///
    /// Descendants stay registered; the backend drops watches on deleted
    /// directories by itself.
    pub fn remove(&mut self, dir: &Path) -> bool {
        if !self.watched.remove(dir) {
            return false;
        }
        if let Err(err) = self.backend.remove_watch(dir) {
            // Expected when the directory is already gone
            tracing::debug!(dir = %dir.display(), error = %err, "unwatch failed");
        }
        true
    }

    /// Release every watch.
    pub fn clear(&mut self) {
        for dir in std::mem::take(&mut self.watched) {
            if let Err(err) = self.backend.remove_watch(&dir) {
                tracing::debug!(dir = %dir.display(), error = %err, "unwatch failed");
            }
        }
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.watched.contains(dir)
    }

    /// Watched directories in sorted order.
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.watched.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.watched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }
}

fn is_ignored_dir(root: &Path, ignores: &IgnoreMatcher, path: &Path) -> bool {
    match relative_to_root(path, root) {
        Ok(relative) => ignores.is_ignored(&relative, true),
        Err(_) => false,
    }
}
