//! Error types for the blobstore crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during content assembly and storage
#[derive(Error, Debug)]
pub enum Error {
    /// No object with this hash in the store
    #[error("no object with hash {0}")]
    NotFound(String),

    /// Stored or fetched bytes do not hash to the expected value
    #[error("content hash was {actual}, expected {expected}")]
    IntegrityMismatch { expected: String, actual: String },

    /// Not a 40 character hex SHA-1 digest
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    /// Failed to read local content referenced by a payload
    #[error("failed to read {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error inside the store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote store failure
    #[error("remote store: {0}")]
    Remote(String),
}

/// Result type for blobstore operations
pub type Result<T> = std::result::Result<T, Error>;
