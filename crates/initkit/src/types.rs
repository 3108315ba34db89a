use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Run state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Active
    Running,
    /// Inactive, failed or never started
    Stopped,
}

impl ServiceState {
    /// Name used in descriptors and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }

    /// State from the exit code of an activity query (0 means running).
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            Self::Running
        } else {
            Self::Stopped
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "running" => Ok(Self::Running),
            "stopped" => Ok(Self::Stopped),
            other => Err(Error::InvalidState(other.to_string())),
        }
    }
}

/// Observed status of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Whether it runs now
    pub state: ServiceState,
    /// Whether it starts at boot
    pub onboot: bool,
}

/// Verbs shared by both init systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start the service
    Start,
    /// Stop the service
    Stop,
    /// Start at boot
    Enable,
    /// Do not start at boot
    Disable,
    /// Reload configuration, restarting if reload is unsupported
    Reload,
}

impl Action {
    /// Action that moves a service into `state`.
    pub fn for_state(state: ServiceState) -> Self {
        match state {
            ServiceState::Running => Self::Start,
            ServiceState::Stopped => Self::Stop,
        }
    }

    /// Action that sets boot enablement.
    pub fn for_onboot(onboot: bool) -> Self {
        if onboot { Self::Enable } else { Self::Disable }
    }

    /// Human readable verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Reload => "reload",
        }
    }
}

/// True when tool output reports a failure, even on a zero exit.
pub fn is_failure(output: &str) -> bool {
    output.starts_with("Failed")
}
