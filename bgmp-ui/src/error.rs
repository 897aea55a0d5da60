//! Error types for bgmp-ui

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the presentation process
#[derive(Error, Debug)]
pub enum Error {
    /// Bus, codec and configuration errors from bgmp-common
    #[error(transparent)]
    Common(#[from] bgmp_common::Error),

    /// Track path given on the command line does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path cannot be carried as a UTF-8 track reference
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    /// Controller process could not be launched
    #[error("Failed to start controller {binary}: {reason}")]
    Spawn { binary: PathBuf, reason: String },

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using bgmp-ui Error
pub type Result<T> = std::result::Result<T, Error>;
