//! systemd via `systemctl`.

use crate::types::Action;

/// Locations probed for `systemctl`, in order.
pub const SYSTEMCTL_PATHS: [&str; 2] = ["/usr/bin/systemctl", "/bin/systemctl"];

/// Markers in `systemctl status` output meaning the unit does not exist.
const MISSING_MARKERS: [&str; 3] = ["Loaded: error", "Loaded: not-found", "could not be found"];

/// A located `systemctl` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Systemctl {
    path: &'static str,
}

impl Systemctl {
    /// Find `systemctl` on the host.
    pub fn detect(exists: impl Fn(&str) -> bool) -> Option<Self> {
        SYSTEMCTL_PATHS
            .iter()
            .copied()
            .find(|p| exists(p))
            .map(|path| Self { path })
    }

    /// Absolute path of the binary.
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// Unit name for a service, e.g. `nginx.service`.
    pub fn unit(name: &str) -> String {
        format!("{name}.service")
    }

    /// `status <unit>`
    pub fn status_args(unit: &str) -> [&str; 2] {
        ["status", unit]
    }

    /// `is-active <unit>`; exit code 0 means running
    pub fn is_active_args(unit: &str) -> [&str; 2] {
        ["is-active", unit]
    }

    /// `is-enabled <unit>`; exit code 0 means enabled
    pub fn is_enabled_args(unit: &str) -> [&str; 2] {
        ["is-enabled", unit]
    }

    /// Arguments for an action on `unit`.
    pub fn action_args(action: Action, unit: &str) -> [&str; 2] {
        let verb = match action {
            Action::Reload => "reload-or-restart",
            other => other.as_str(),
        };
        [verb, unit]
    }
}

/// True when status output says the unit does not exist.
pub fn status_means_missing(output: &str) -> bool {
    MISSING_MARKERS.iter().any(|m| output.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_order() {
        let found = Systemctl::detect(|p| p == "/bin/systemctl").unwrap();
        assert_eq!(found.path(), "/bin/systemctl");
        let found = Systemctl::detect(|_| true).unwrap();
        assert_eq!(found.path(), "/usr/bin/systemctl");
        assert!(Systemctl::detect(|_| false).is_none());
    }

    #[test]
    fn test_action_args() {
        let unit = Systemctl::unit("nginx");
        assert_eq!(Systemctl::action_args(Action::Start, &unit), ["start", "nginx.service"]);
        assert_eq!(
            Systemctl::action_args(Action::Reload, &unit),
            ["reload-or-restart", "nginx.service"]
        );
        assert_eq!(Systemctl::action_args(Action::Disable, &unit), ["disable", "nginx.service"]);
    }

    #[test]
    fn test_missing_markers() {
        let legacy = "\
nosuch.service
   Loaded: error (Reason: No such file or directory)
   Active: inactive (dead)
";
        assert!(status_means_missing(legacy));
        let modern = "\
○ nosuch.service
     Loaded: not-found (Reason: Unit nosuch.service not found.)
     Active: inactive (dead)
";
        assert!(status_means_missing(modern));
        assert!(status_means_missing("Unit nosuch.service could not be found.\n"));

        let present = "\
● sshd.service - OpenSSH server daemon
     Loaded: loaded (/usr/lib/systemd/system/sshd.service; enabled; preset: enabled)
     Active: active (running) since Mon 2024-01-15 10:00:00 UTC; 2h ago
";
        assert!(!status_means_missing(present));
    }
}
