//! Error types for init system operations.

use thiserror::Error;

/// Errors that can occur when driving an init system.
#[derive(Debug, Error)]
pub enum Error {
    /// The init system does not know the service.
    #[error("the {0} service does not exist")]
    NotFound(String),

    /// The tool reported a failure for an action.
    #[error("unable to {action} {service}: {message}")]
    ActionFailed {
        /// Verb that failed, e.g. `start`
        action: String,
        /// Service name
        service: String,
        /// Failure output of the tool
        message: String,
    },

    /// Unknown desired service state.
    #[error("invalid service state: {0} (expected running or stopped)")]
    InvalidState(String),
}

/// Result type for init system operations.
pub type Result<T> = std::result::Result<T, Error>;
