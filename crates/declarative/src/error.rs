//! Error taxonomy for reconciliation.
//!
//! Errors are categorized so callers can tell an absent entity from a
//! conflict, an external tool failure, or a value that is not known yet.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{CommandOutput, ResourceKind};

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The entity does not exist on the host
    NotFound,
    /// The identity is occupied, or fetched content does not match its hash
    Conflict,
    /// An external command exited non-zero, timed out or reported failure
    ExternalCommand,
    /// A desired value could not be resolved
    Deferred,
    /// No handler for the resource kind is available on this host
    Unsupported,
    /// The descriptor is missing or carries an invalid attribute
    Invalid,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Entity not found",
            Self::Conflict => "Conflict",
            Self::ExternalCommand => "External command failed",
            Self::Deferred => "Value not yet known",
            Self::Unsupported => "Unsupported on this host",
            Self::Invalid => "Invalid descriptor",
            Self::Other => "Unexpected error",
        }
    }
}

/// Errors that can occur while reconciling a resource.
#[derive(Debug, Error)]
pub enum Error {
    /// Entity is absent on the host
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Identity already occupied or otherwise conflicting
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Fetched content does not hash to the expected value
    #[error("content hash was {actual}, expected {expected}")]
    IntegrityMismatch { expected: String, actual: String },

    /// External command exited non-zero or reported failure
    #[error("command `{command}` failed (exit {code}): {}", output_detail(.stdout, .stderr))]
    CommandFailed {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    /// Tool-specific failure, already classified by the tool model
    #[error("{tool}: {message}")]
    Tool { tool: String, message: String },

    /// External command exceeded its time budget
    #[error("command `{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    /// Desired value is not resolvable yet
    #[error("attribute {attribute} is not yet known: {reason}")]
    Deferred { attribute: String, reason: String },

    /// No available handler for the kind
    #[error("no available handler for {kind} on this host")]
    Unsupported { kind: ResourceKind },

    /// Required attribute missing from the descriptor
    #[error("missing attribute: {attribute}")]
    MissingAttribute { attribute: String },

    /// Attribute present but unusable
    #[error("invalid attribute {attribute}: {message}")]
    InvalidAttribute { attribute: String, message: String },

    /// Content store failure
    #[error("content store: {0}")]
    Store(String),

    /// Remote settings failure
    #[error("settings: {0}")]
    Settings(String),

    /// Filesystem error
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

fn output_detail(stdout: &str, stderr: &str) -> String {
    let out = CommandOutput::new(stdout, stderr, 0).combined();
    if out.is_empty() {
        "no output".to_string()
    } else {
        out
    }
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Conflict { .. } | Error::IntegrityMismatch { .. } => ErrorCategory::Conflict,
            Error::CommandFailed { .. } | Error::Tool { .. } | Error::Timeout { .. } => {
                ErrorCategory::ExternalCommand
            }
            Error::Deferred { .. } => ErrorCategory::Deferred,
            Error::Unsupported { .. } => ErrorCategory::Unsupported,
            Error::MissingAttribute { .. } | Error::InvalidAttribute { .. } => {
                ErrorCategory::Invalid
            }
            _ => ErrorCategory::Other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound { what: what.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Error::Conflict {
            message: message.into(),
        }
    }

    /// Build a command failure from captured output
    pub fn command_failed(command: &str, args: &[&str], output: &CommandOutput) -> Self {
        Error::CommandFailed {
            command: command_line(command, args),
            code: output.code,
            stdout: output.stdout.clone(),
            stderr: output.stderr.clone(),
        }
    }

    /// Wrap an IO error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Render a command and its arguments as one line
pub fn command_line(command: &str, args: &[&str]) -> String {
    if args.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, args.join(" "))
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
