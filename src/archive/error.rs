//! Archive error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing the archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Filesystem operation failed.
    #[error("archive I/O error at '{}': {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding or decoding failed.
    #[error("archive csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
