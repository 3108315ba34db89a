//! Package state types.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Observed state of a package on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    /// Installed from any repository
    Installed,
    /// Not installed (possibly available)
    Removed,
}

impl PackageState {
    /// Name used in descriptors and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared target state of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    /// Installed at any version
    Installed,
    /// Not installed
    Removed,
    /// Installed and updated whenever an update is available
    Latest,
}

impl FromStr for DesiredState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "installed" => Ok(Self::Installed),
            "removed" => Ok(Self::Removed),
            "latest" => Ok(Self::Latest),
            other => Err(Error::InvalidState(other.to_string())),
        }
    }
}

/// Version and release of an RPM package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// Upstream version, e.g. `2.4.6`
    pub version: String,
    /// Distribution release, e.g. `99.el7`
    pub release: String,
}

impl Version {
    /// Build from version and release parts.
    pub fn new(version: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release: release.into(),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.version, self.release)
    }
}

/// Snapshot of a package as reported by `info` and `check-update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    /// Installed or removed
    pub state: PackageState,
    /// Version shown by `info`, when the package is known at all
    pub version: Option<Version>,
    /// Newer version offered by `check-update`
    pub update: Option<Version>,
}

impl PackageInfo {
    /// A package no repository knows about.
    pub fn removed() -> Self {
        Self {
            state: PackageState::Removed,
            version: None,
            update: None,
        }
    }
}
