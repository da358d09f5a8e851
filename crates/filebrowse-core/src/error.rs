//! Error and read-report types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by listing collaborators.
///
/// These never reach callers of the list query surface; scans turn them into
/// [`ReadWarning`]s and carry on.
#[derive(Debug, Error)]
pub enum ListError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A library container could not be opened.
    #[error("Cannot open library {path}: {message}")]
    LibraryOpen { path: PathBuf, message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl ListError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a library open error.
    pub fn library_open(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::LibraryOpen {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Kind of read warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading a directory.
    ReadError,
    /// A library container could not be opened.
    LibraryOpenFailed,
    /// Alias or symlink target does not exist.
    BrokenAlias,
    /// Error reading metadata.
    MetadataError,
}

/// Non-fatal problem encountered during a read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ReadWarning {
    /// Create a new read warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Turn a collaborator error into a warning for the given path.
    pub fn from_error(path: impl Into<PathBuf>, error: &ListError) -> Self {
        let kind = match error {
            ListError::PermissionDenied { .. } => WarningKind::PermissionDenied,
            ListError::LibraryOpen { .. } => WarningKind::LibraryOpenFailed,
            _ => WarningKind::ReadError,
        };
        Self::new(path, error.to_string(), kind)
    }

    /// Create a broken alias warning.
    pub fn broken_alias(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Broken alias: {}", path.display()),
            path,
            kind: WarningKind::BrokenAlias,
        }
    }

    /// Create a library open failure warning.
    pub fn library_open_failed(path: impl Into<PathBuf>, reason: &str) -> Self {
        let path = path.into();
        Self {
            message: format!("Cannot open library {}: {reason}", path.display()),
            path,
            kind: WarningKind::LibraryOpenFailed,
        }
    }
}

/// Warnings collected over one read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadReport {
    /// Collected warnings, in discovery order.
    pub warnings: Vec<ReadWarning>,
    /// Whether the read was cancelled before finishing.
    pub cancelled: bool,
}

impl ReadReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning.
    pub fn push(&mut self, warning: ReadWarning) {
        self.warnings.push(warning);
    }

    /// Check if nothing went wrong.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Count warnings of a given kind.
    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }
}
