//! Error types for bgmp-ap

use thiserror::Error;

/// Main error type for the controller process
#[derive(Error, Debug)]
pub enum Error {
    /// Bus, codec and configuration errors from bgmp-common
    #[error(transparent)]
    Common(#[from] bgmp_common::Error),

    /// Media backend refused an operation
    #[error("Backend error: {0}")]
    Backend(String),

    /// Backend used after release
    #[error("Backend already released")]
    BackendReleased,
}

/// Convenience Result type using bgmp-ap Error
pub type Result<T> = std::result::Result<T, Error>;
