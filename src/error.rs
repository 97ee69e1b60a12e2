//! Error types for module scanning and reconciliation.
//!
//! A single [`ModelError`] covers every failure the model layer can report.
//! `NotFound` is kept apart from generic I/O because the reconciler treats a
//! vanished path as a deletion rather than a failure.

use std::io;
use std::path::PathBuf;

/// Result alias used across the model layer.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while reading, parsing or watching a module.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Open, list or read failure other than not-found
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Path does not exist (or vanished before it could be read)
    #[error("path not found: '{path}'")]
    NotFound { path: String },

    /// A directory listing was requested for a regular file
    #[error("not a directory: '{path}'")]
    NotADirectory { path: String },

    /// Malformed source text where strict parsing is required
    #[error("failed to parse '{path}': {message}")]
    Parse { path: String, message: String },

    /// Watch registration failed for a directory
    #[error("cannot watch '{}': {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// An ignore pattern could not be compiled
    #[error("invalid ignore rule: {0}")]
    Ignore(#[from] ignore::Error),
}

impl ModelError {
    /// Classify an I/O error for `path`, separating out not-found.
    pub fn from_io(path: impl Into<String>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => ModelError::NotFound { path },
            _ => ModelError::Io { path, source: err },
        }
    }

    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        ModelError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Attach a path to an error raised before the path was known.
    ///
    /// Parsers work on raw bytes and report an empty path; callers fill it in.
    pub fn with_path(self, path: &str) -> Self {
        match self {
            ModelError::Parse { path: p, message } if p.is_empty() => ModelError::Parse {
                path: path.to_string(),
                message,
            },
            ModelError::Io { path: p, source } if p.is_empty() => ModelError::Io {
                path: path.to_string(),
                source,
            },
            other => other,
        }
    }

    /// Whether the path is missing, including a directory that vanished
    /// before a watch could be placed on it.
    pub fn is_not_found(&self) -> bool {
        match self {
            ModelError::NotFound { .. } => true,
            ModelError::Watch { source, .. } => match &source.kind {
                notify::ErrorKind::PathNotFound => true,
                notify::ErrorKind::Io(err) => err.kind() == io::ErrorKind::NotFound,
                _ => false,
            },
            _ => false,
        }
    }

    pub fn is_not_a_directory(&self) -> bool {
        matches!(self, ModelError::NotADirectory { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, ModelError::Parse { .. })
    }
}
