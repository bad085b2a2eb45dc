//! Error types for the download module.
//!
//! A [`DownloadError`] describes why a single song failed; it is recorded in
//! that song's outcome and never aborts the batch. [`EngineError`] covers
//! problems with the engine itself.

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;

use super::path::PathError;

/// Minimum allowed worker count.
pub const MIN_WORKERS: usize = 1;

/// Largest pool the engine builds; bigger requests are clamped to it.
pub const MAX_WORKERS: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Errors that can occur while downloading one song.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The server could not deliver the song's bytes.
    #[error("failed to fetch song {song_id}: {source}")]
    Fetch {
        /// The song id.
        song_id: String,
        /// The underlying catalog error.
        #[source]
        source: CatalogError,
    },

    /// No target path could be formed.
    #[error("no target path for song {song_id}: {source}")]
    Path {
        /// The song id.
        song_id: String,
        /// The underlying path error.
        #[source]
        source: PathError,
    },

    /// File system error while writing the song.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The worker task panicked.
    #[error("download task for song {song_id} panicked: {message}")]
    Panicked {
        /// The song id.
        song_id: String,
        /// The join error text.
        message: String,
    },
}

impl DownloadError {
    /// Creates a fetch error.
    pub fn fetch(song_id: impl Into<String>, source: CatalogError) -> Self {
        Self::Fetch {
            song_id: song_id.into(),
            source,
        }
    }

    /// Creates a path error.
    pub fn path(song_id: impl Into<String>, source: PathError) -> Self {
        Self::Path {
            song_id: song_id.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Error type for download engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be at least {MIN_WORKERS}")]
    InvalidWorkerCount {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}
