//! Error types for package tool operations.
//!
//! Failures are classified from the tool's own output so reports can say
//! more than "exit code 1". Nothing here is retried: a failed command fails
//! the current reconciliation attempt.

use thiserror::Error;

/// Categories of package tool errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No package with this name in any enabled repository
    NotFound,
    /// Repository metadata could not be fetched
    Repository,
    /// Another process holds the package database lock
    Locked,
    /// Not running with enough privileges
    Permission,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Package not found",
            Self::Repository => "Repository unavailable",
            Self::Locked => "Package database locked",
            Self::Permission => "Permission denied",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Verify the package name or enable the repository that provides it",
            Self::Repository => "Check network access and the repository configuration",
            Self::Locked => "Wait for the other package operation to finish and run again",
            Self::Permission => "Run the agent as root",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during package tool operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No package with this name
    #[error("package not found: {name}: {message}")]
    NotFound {
        /// Name of the package that could not be found
        name: String,
        /// Output of the failed command
        message: String,
    },

    /// Repository metadata unavailable
    #[error("repository error: {message}")]
    Repository {
        /// Output of the failed command
        message: String,
    },

    /// Package database locked by another process
    #[error("package database locked: {message}")]
    Locked {
        /// Output of the failed command
        message: String,
    },

    /// Insufficient privileges
    #[error("permission denied: {message}")]
    Permission {
        /// Output of the failed command
        message: String,
    },

    /// Command failed for another reason
    #[error("{message}: stdout: {stdout} errout: {stderr}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard output of the failed command
        stdout: String,
        /// Standard error of the failed command
        stderr: String,
    },

    /// Unknown desired package state
    #[error("invalid package state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Repository { .. } => ErrorCategory::Repository,
            Error::Locked { .. } => ErrorCategory::Locked,
            Error::Permission { .. } => ErrorCategory::Permission,
            _ => ErrorCategory::Other,
        }
    }

    /// Create an error from yum/dnf command output.
    ///
    /// Analyzes both streams to categorize the error. Every variant keeps
    /// the tool's output.
    pub fn from_yum_output(stdout: &str, stderr: &str, package_name: &str) -> Self {
        let combined = format!("{stdout}\n{stderr}");
        let lower = combined.to_lowercase();
        let message = combined.trim().to_string();

        if lower.contains("no package")
            || lower.contains("unable to find a match")
            || lower.contains("no match for argument")
            || lower.contains("nothing to do")
        {
            return Error::NotFound {
                name: package_name.to_string(),
                message,
            };
        }

        if lower.contains("cannot retrieve repository metadata")
            || lower.contains("failed to download metadata")
            || lower.contains("could not resolve host")
            || lower.contains("cannot find a valid baseurl")
            || lower.contains("curl error")
        {
            return Error::Repository { message };
        }

        if lower.contains("another app is currently holding the yum lock")
            || lower.contains("waiting for process with pid")
            || lower.contains("existing lock")
        {
            return Error::Locked { message };
        }

        if lower.contains("you need to be root")
            || lower.contains("this command has to be run with superuser privileges")
            || lower.contains("permission denied")
        {
            return Error::Permission { message };
        }

        Error::CommandFailed {
            message: format!("Yum failed for {package_name}"),
            stdout: stdout.trim().to_string(),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for package tool operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yum_output_not_found() {
        let err = Error::from_yum_output("", "Error: Unable to find a match: nosuchpkg", "nosuchpkg");
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(err.to_string().contains("Unable to find a match: nosuchpkg"));
        let err = Error::from_yum_output("No package nosuchpkg available.\n", "", "nosuchpkg");
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_from_yum_output_repository() {
        let err = Error::from_yum_output(
            "",
            "Error: Failed to download metadata for repo 'appstream'",
            "httpd",
        );
        assert_eq!(err.category(), ErrorCategory::Repository);
    }

    #[test]
    fn test_from_yum_output_locked() {
        let err = Error::from_yum_output(
            "Another app is currently holding the yum lock; waiting for it to exit...",
            "",
            "httpd",
        );
        assert_eq!(err.category(), ErrorCategory::Locked);
    }

    #[test]
    fn test_from_yum_output_permission() {
        let err = Error::from_yum_output("", "Error: This command has to be run with superuser privileges", "httpd");
        assert_eq!(err.category(), ErrorCategory::Permission);
    }

    #[test]
    fn test_from_yum_output_other_keeps_both_streams() {
        let err = Error::from_yum_output("Transaction check error", "file conflicts", "httpd");
        assert_eq!(err.category(), ErrorCategory::Other);
        let msg = err.to_string();
        assert!(msg.contains("Transaction check error"));
        assert!(msg.contains("file conflicts"));
    }
}
