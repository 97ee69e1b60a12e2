//! Gitignore-style path exclusion for scanning and watching.
//!
//! Patterns follow `.gitignore` precedence: later patterns override earlier
//! ones, `!` re-includes, and a trailing `/` restricts a pattern to
//! directories. A path is excluded when it or any of its parent directories
//! matches.
//!
//! Matching is done on slash-separated paths relative to the filesystem root
//! the module was scanned from.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::Result;
use crate::validation::clean_path;

/// Directories excluded unless a later pattern re-includes them.
pub const DEFAULT_IGNORES: &[&str] = &[".git", "node_modules"];

/// Compiled ignore rules.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    gitignore: Gitignore,
}

impl IgnoreMatcher {
    /// Compile a matcher from explicit patterns.
    ///
    /// # Arguments
    /// * `root` - Directory the patterns are relative to
    /// * `patterns` - Gitignore lines, in precedence order
    pub fn new<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in patterns {
            builder.add_line(None, pattern.as_ref())?;
        }
        Ok(Self {
            gitignore: builder.build()?,
        })
    }

    /// A matcher that excludes nothing.
    pub fn empty() -> Self {
        Self {
            gitignore: Gitignore::empty(),
        }
    }

    /// Build the matcher used for a module on disk.
    ///
    /// Rule order is [`DEFAULT_IGNORES`], then the root's `.gitignore` when
    /// `gitignore_aware` is set, then `extra`.
    pub fn for_root<S: AsRef<str>>(root: &Path, gitignore_aware: bool, extra: &[S]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in DEFAULT_IGNORES {
            builder.add_line(None, pattern)?;
        }

        if gitignore_aware {
            let gitignore_path: PathBuf = root.join(".gitignore");
            if gitignore_path.is_file() {
                // A malformed .gitignore only loses its own rules
                if let Some(err) = builder.add(&gitignore_path) {
                    tracing::warn!(path = %gitignore_path.display(), error = %err, "failed to load .gitignore");
                }
            }
        }

        for pattern in extra {
            builder.add_line(None, pattern.as_ref())?;
        }

        let gitignore = builder.build()?;
        tracing::debug!(root = %root.display(), rules = gitignore.len(), "ignore rules compiled");
        Ok(Self { gitignore })
    }

    /// Whether `path` (or one of its parents) is excluded.
    ///
    /// The root itself (`.`) is never excluded.
    pub fn is_ignored(&self, path: &str, is_dir: bool) -> bool {
        let path = clean_path(path);
        if path == "." || path.starts_with('/') || path.starts_with("..") {
            return false;
        }
        self.gitignore
            .matched_path_or_any_parents(Path::new(&path), is_dir)
            .is_ignore()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.gitignore.is_empty()
    }
}

impl Default for IgnoreMatcher {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn matcher(patterns: &[&str]) -> IgnoreMatcher {
        IgnoreMatcher::new(Path::new("/module"), patterns).unwrap()
    }

    #[test]
    fn test_empty_matches_nothing() {
        let m = IgnoreMatcher::empty();
        assert!(!m.is_ignored("subdir", true));
        assert!(!m.is_ignored(".git", true));
        assert!(m.is_empty());
    }

    #[test]
    fn test_anchored_path_pattern() {
        let m = matcher(&["subdir/another"]);
        assert!(m.is_ignored("subdir/another", true));
        assert!(m.is_ignored("subdir/another/deep/x.go", false));
        assert!(!m.is_ignored("subdir", true));
        assert!(!m.is_ignored("other/subdir/another", true));
    }

    #[test]
    fn test_directory_only_pattern() {
        let m = matcher(&["build/"]);
        assert!(m.is_ignored("build", true));
        assert!(!m.is_ignored("build", false));
        assert!(m.is_ignored("pkg/build", true));
    }

    #[test]
    fn test_negation_reincludes() {
        let m = matcher(&["gen*", "!generated_keep"]);
        assert!(m.is_ignored("gen_out", true));
        assert!(!m.is_ignored("generated_keep", true));
    }

    #[test]
    fn test_root_is_never_ignored() {
        let m = matcher(&["*"]);
        assert!(!m.is_ignored(".", true));
        assert!(!m.is_ignored("", true));
    }

    #[test]
    fn test_for_root_loads_defaults_and_gitignore() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(".gitignore"), "dist/\n").unwrap();

        let m = IgnoreMatcher::for_root(temp_dir.path(), true, &["tmp"]).unwrap();
        assert!(m.is_ignored(".git", true));
        assert!(m.is_ignored("web/node_modules", true));
        assert!(m.is_ignored("dist", true));
        assert!(m.is_ignored("tmp", true));
        assert!(!m.is_ignored("pkg", true));

        let m = IgnoreMatcher::for_root(temp_dir.path(), false, &[] as &[&str]).unwrap();
        assert!(!m.is_ignored("dist", true));
        assert!(m.is_ignored(".git", true));
    }
}
