//! Legacy SysV init via `service` and `chkconfig`.

use crate::systemd::SYSTEMCTL_PATHS;
use crate::types::Action;

/// `chkconfig` binary.
pub const CHKCONFIG: &str = "/sbin/chkconfig";

/// `service` binary.
pub const SERVICE: &str = "/sbin/service";

/// Marker in `chkconfig --list` output for an unknown service.
const MISSING_MARKER: &str = "error reading information on service";

/// SysV tool set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sysv;

impl Sysv {
    /// Available when both tools exist and systemd does not.
    pub fn detect(exists: impl Fn(&str) -> bool) -> Option<Self> {
        (exists(CHKCONFIG) && exists(SERVICE) && !exists(SYSTEMCTL_PATHS[0])).then_some(Self)
    }

    /// `chkconfig --list <name>`
    pub fn list_args(name: &str) -> [&str; 2] {
        ["--list", name]
    }

    /// `service <name> status`; exit code 0 means running
    pub fn status_args(name: &str) -> [&str; 2] {
        [name, "status"]
    }

    /// Binary and arguments for an action on service `name`.
    pub fn action_command(action: Action, name: &str) -> (&'static str, [&str; 2]) {
        match action {
            Action::Start => (SERVICE, [name, "start"]),
            Action::Stop => (SERVICE, [name, "stop"]),
            Action::Reload => (SERVICE, [name, "reload"]),
            Action::Enable => (CHKCONFIG, [name, "on"]),
            Action::Disable => (CHKCONFIG, [name, "off"]),
        }
    }
}

/// True when `chkconfig --list` output says the service is unknown.
pub fn listing_means_missing(output: &str) -> bool {
    output.contains(MISSING_MARKER)
}

/// True when `chkconfig --list` output shows any runlevel switched on.
pub fn listing_enabled(output: &str) -> bool {
    output.contains(":on")
}
