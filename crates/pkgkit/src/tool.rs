//! Package tool selection and argument building.

/// Binaries that provide the rpm database.
pub const RPM_PATHS: [&str; 2] = ["/usr/bin/rpm", "/bin/rpm"];

/// Flags passed on every invocation: quiet debug and error output, assume yes.
pub const COMMON_ARGS: [&str; 5] = ["-d", "0", "-e", "0", "-y"];

/// yum-compatible front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageTool {
    /// `/usr/bin/yum`
    Yum,
    /// `/usr/bin/dnf`
    Dnf,
}

impl PackageTool {
    /// Pick the tool present on the host, preferring dnf.
    ///
    /// Returns `None` unless an rpm binary is also present.
    pub fn detect(exists: impl Fn(&str) -> bool) -> Option<Self> {
        if !RPM_PATHS.iter().any(|p| exists(p)) {
            return None;
        }
        if exists(Self::Dnf.path()) {
            Some(Self::Dnf)
        } else if exists(Self::Yum.path()) {
            Some(Self::Yum)
        } else {
            None
        }
    }

    /// Absolute path of the binary.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Yum => "/usr/bin/yum",
            Self::Dnf => "/usr/bin/dnf",
        }
    }

    /// Arguments for `action` on package `name`.
    pub fn args<'a>(&self, action: Action, name: &'a str) -> Vec<&'a str> {
        let mut args: Vec<&str> = COMMON_ARGS.to_vec();
        args.push(action.as_str());
        args.push(name);
        args
    }
}

/// Package tool sub-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Describe installed and available versions
    Info,
    /// List a newer version if one exists
    CheckUpdate,
    /// Install the package
    Install,
    /// Update the package to the newest version
    Update,
    /// Remove the package
    Remove,
}

impl Action {
    /// Sub-command name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::CheckUpdate => "check-update",
            Self::Install => "install",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }
}
