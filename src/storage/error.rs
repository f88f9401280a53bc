//! Store error taxonomy
//!
//! Every failure a store can produce, with enough context (path, id,
//! operation) for a user-facing message. Mutating operations propagate these
//! verbatim; bulk listings instead skip corrupt files and report them
//! alongside the results (see the `skipped` fields on listing types).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed header, or header fields that cannot be interpreted.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Missing task/resource/revision/comment/column/workspace.
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    /// Column name not present in the board configuration.
    #[error("unknown column: {0}")]
    InvalidColumn(String),

    /// Resource kind outside task/prompt/document.
    #[error("unknown resource kind: {0}")]
    InvalidKind(String),

    /// Identifier collision detected at create time. Surfaced, never
    /// silently renumbered.
    #[error("id {id} is already taken by {path}")]
    Conflict { id: u32, path: PathBuf },

    /// Board configuration that cannot be parsed or is self-contradictory.
    #[error("invalid config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// Filesystem failure, surfaced as-is with the operation and path.
    #[error("{op} failed for {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::Parse { path: path.into(), reason: reason.into() }
    }

    pub fn not_found(what: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound { what, key: key.to_string() }
    }

    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io { op, path: path.into(), source }
    }

    /// True when the underlying cause is a file that no longer exists —
    /// external actors may move or delete files between a directory listing
    /// and the read that follows, and read paths treat that as NotFound.
    pub fn is_gone(&self) -> bool {
        match self {
            StoreError::NotFound { .. } => true,
            StoreError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// A file skipped during a bulk listing, reported rather than failing the
/// whole listing.
#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: StoreError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = StoreError::parse("/board/todo/001-x.md", "missing `id`");
        assert_eq!(
            err.to_string(),
            "failed to parse /board/todo/001-x.md: missing `id`"
        );

        let err = StoreError::not_found("task", 7);
        assert_eq!(err.to_string(), "task not found: 7");
    }

    #[test]
    fn gone_detection() {
        assert!(StoreError::not_found("task", 1).is_gone());
        let io_gone = StoreError::io(
            "read",
            "/x",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(io_gone.is_gone());
        let io_other =
            StoreError::io("read", "/x", io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(!io_other.is_gone());
    }
}
