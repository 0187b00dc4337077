use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by walk, scan and clean operations.
///
/// Transient per-entry access errors are not represented here; those are
/// logged and skipped at the point of failure. This type covers the failures
/// a caller can act on: a missing browse root, an unreadable configured
/// category root, a bad glob pattern, or a failed recycle-bin call.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("recycle bin operation failed: {0}")]
    RecycleBin(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SweepError {
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => SweepError::NotFound(path),
            std::io::ErrorKind::PermissionDenied => SweepError::PermissionDenied(path),
            _ => SweepError::Io { path, source },
        }
    }
}
