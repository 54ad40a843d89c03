//! # Container Errors
//!
//! Every failure is scoped to one document (export) or one file (import).
//! [`ContainerError::kind`] sorts failures into transport, format, and
//! mapping classes. State mismatches are not errors; they are reported
//! on successful outcomes.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::document::Scope;
use crate::remote::RemoteError;

/// Result type for container operations
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Remote endpoint failed or answered unusably
    Transport,
    /// Container missing, unreadable, or malformed
    Format,
    /// Declared document type has no remote create command
    Mapping,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Format => "format",
            ErrorKind::Mapping => "mapping",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("I/O error at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Container has no '{0}' entry")]
    MissingEntry(String),

    #[error("Entry '{entry}' is malformed: {reason}")]
    Parse { entry: String, reason: String },

    #[error("Could not serialize '{entry}': {reason}")]
    Serialize { entry: String, reason: String },

    #[error("Operation log out of order: {0}")]
    IndexOrder(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Batch {batch} of {scope} operations rejected: {reason}")]
    BatchRejected {
        scope: Scope,
        batch: usize,
        reason: String,
    },

    #[error("No create command for document type '{0}'")]
    UnknownDocumentType(String),
}

impl ContainerError {
    pub fn io_at(path: &Path, source: std::io::Error) -> Self {
        ContainerError::Io {
            path: path.display().to_string(),
            reason: source.to_string(),
        }
    }

    pub fn parse(entry: &str, source: serde_json::Error) -> Self {
        ContainerError::Parse {
            entry: entry.to_string(),
            reason: source.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ContainerError::Remote(_) | ContainerError::BatchRejected { .. } => ErrorKind::Transport,
            ContainerError::UnknownDocumentType(_) => ErrorKind::Mapping,
            ContainerError::Io { .. }
            | ContainerError::MissingEntry(_)
            | ContainerError::Parse { .. }
            | ContainerError::Serialize { .. }
            | ContainerError::IndexOrder(_)
            | ContainerError::Archive(_) => ErrorKind::Format,
        }
    }
}
