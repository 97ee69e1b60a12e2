//! Path normalization for module-relative paths.
//!
//! Model paths are slash-separated and relative to the module root, with the
//! root itself spelled `.`. Watcher events arrive as absolute OS paths and are
//! converted here before they reach the reconciler.

use std::path::{Component, Path};

/// Error types for path validation.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    /// Path lies outside the module root
    #[error("path escapes module root: {0} (root: {1})")]
    OutsideRoot(String, String),

    /// Path is not valid UTF-8 and cannot be stored in the model
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8(String),
}

/// Lexically clean a slash-separated path.
///
/// Follows the usual rules: repeated slashes collapse, `.` segments drop,
/// `..` consumes the previous segment, and the empty path becomes `.`.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            s => parts.push(s),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Join a directory and an entry name, treating `.` as the root.
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = clean_path(dir);
    if dir == "." {
        clean_path(name)
    } else {
        clean_path(&format!("{}/{}", dir, name))
    }
}

/// Split a path into its parent directory and final element.
///
/// A path with no separator lives in the root, so its parent is `.`.
pub fn split_path(path: &str) -> (String, String) {
    let cleaned = clean_path(path);
    match cleaned.rfind('/') {
        Some(0) => ("/".to_string(), cleaned[1..].to_string()),
        Some(idx) => (cleaned[..idx].to_string(), cleaned[idx + 1..].to_string()),
        None => (".".to_string(), cleaned),
    }
}

/// Whether two directory paths name the same directory.
///
/// `.` and `""` both denote the module root.
pub fn same_dir(a: &str, b: &str) -> bool {
    clean_path(a) == clean_path(b)
}

/// Convert an absolute event path into a module-relative slash path.
///
/// # Arguments
/// * `path` - Path reported by the watcher
/// * `root` - Module root the watcher was started on
///
/// # Returns
/// Cleaned relative path (`.` for the root itself), or an error if `path`
/// is outside `root` or not representable as UTF-8
pub fn relative_to_root(path: &Path, root: &Path) -> Result<String, PathValidationError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        PathValidationError::OutsideRoot(
            path.to_string_lossy().to_string(),
            root.to_string_lossy().to_string(),
        )
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| PathValidationError::NonUtf8(path.to_string_lossy().to_string()))?;
                segments.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => segments.push(".."),
            Component::RootDir | Component::Prefix(_) => {}
        }
    }

    let cleaned = clean_path(&segments.join("/"));
    if cleaned == ".." || cleaned.starts_with("../") {
        return Err(PathValidationError::OutsideRoot(
            path.to_string_lossy().to_string(),
            root.to_string_lossy().to_string(),
        ));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("./"), ".");
        assert_eq!(clean_path("a//b/./c/"), "a/b/c");
        assert_eq!(clean_path("a/b/../c"), "a/c");
        assert_eq!(clean_path("../a"), "../a");
        assert_eq!(clean_path("/../a"), "/a");
    }

    #[test]
    fn test_split_and_join() {
        assert_eq!(split_path("go.mod"), (".".to_string(), "go.mod".to_string()));
        assert_eq!(
            split_path("pkg/sub/x_test.go"),
            ("pkg/sub".to_string(), "x_test.go".to_string())
        );
        assert_eq!(join_path(".", "pkg"), "pkg");
        assert_eq!(join_path("", "pkg"), "pkg");
        assert_eq!(join_path("pkg", "sub"), "pkg/sub");
    }

    #[test]
    fn test_same_dir_treats_empty_as_root() {
        assert!(same_dir(".", ""));
        assert!(same_dir("", "."));
        assert!(same_dir("pkg/", "pkg"));
        assert!(!same_dir("pkg", "pkg/sub"));
    }

    #[test]
    fn test_relative_to_root() {
        let root = PathBuf::from("/work/mod");
        assert_eq!(
            relative_to_root(Path::new("/work/mod/pkg/a.go"), &root).unwrap(),
            "pkg/a.go"
        );
        assert_eq!(relative_to_root(Path::new("/work/mod"), &root).unwrap(), ".");
        assert!(matches!(
            relative_to_root(Path::new("/work/other/a.go"), &root),
            Err(PathValidationError::OutsideRoot(_, _))
        ));
    }
}
