//! Error types for orchestrator calls.

use thiserror::Error;

/// Errors that can occur talking to the orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport or status error
    #[error("HTTP error: {message}")]
    Http {
        /// Error description
        message: String,
        /// HTTP status code, if the server answered
        status: Option<u16>,
    },

    /// Response body was not what the API promises
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Stored setting has an unexpected shape
    #[error("setting {key} is malformed: {message}")]
    MalformedSetting {
        /// Setting key
        key: String,
        /// What was wrong
        message: String,
    },
}

impl Error {
    /// HTTP status code, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Result type for orchestrator calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        let err: Error = ureq::Error::StatusCode(404).into();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "HTTP error: HTTP 404");
    }
}
