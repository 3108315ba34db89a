//! Parsers for yum/dnf text output.
//!
//! The output format is an unversioned contract, so every parser here is
//! pinned by tests against literal sample output.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::types::{PackageInfo, PackageState, Version};

static FIELD_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+) :\s+(.+)").expect("valid regex"));

static UPDATE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S+)\s+(\S+)\s+(\S+)").expect("valid regex"));

/// Marker line after which `info` lists packages that are not installed.
const AVAILABLE_MARKER: &str = "Available Packages";

/// Repository values meaning the package is installed.
const INSTALLED_REPOS: [&str; 2] = ["installed", "@System"];

/// Parse `Key : value` lines into an ordered field map.
///
/// A line whose key is blank continues the previous field; its value is
/// appended after a single space. Parsing stops at the available-packages
/// marker so an installed package's fields are not overwritten.
pub fn parse_info_fields<'a>(lines: impl IntoIterator<Item = &'a str>) -> IndexMap<String, String> {
    let mut fields: IndexMap<String, String> = IndexMap::new();
    let mut last_key: Option<String> = None;

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == AVAILABLE_MARKER {
            break;
        }
        let Some(caps) = FIELD_LINE.captures(line) else {
            continue;
        };
        let key = caps[1].trim();
        let value = &caps[2];

        if key.is_empty() {
            if let Some(previous) = last_key.as_ref().and_then(|k| fields.get_mut(k)) {
                previous.push(' ');
                previous.push_str(value);
            }
        } else {
            fields.insert(key.to_string(), value.to_string());
            last_key = Some(key.to_string());
        }
    }
    fields
}

/// Parse the stdout of `info <name>`.
///
/// The first line is a section header and is skipped. Without a repository
/// field the package is unknown and reported as removed.
pub fn parse_info(stdout: &str) -> PackageInfo {
    let fields = parse_info_fields(stdout.split('\n').skip(1));

    let Some(repo) = fields.get("Repo").or_else(|| fields.get("Repository")) else {
        return PackageInfo::removed();
    };

    let state = if INSTALLED_REPOS.contains(&repo.as_str()) {
        PackageState::Installed
    } else {
        PackageState::Removed
    };

    let version = match (fields.get("Version"), fields.get("Release")) {
        (Some(v), Some(r)) => Some(Version::new(v.clone(), r.clone())),
        _ => None,
    };

    PackageInfo {
        state,
        version,
        update: None,
    }
}

/// Parse the stdout of `check-update <name>`.
///
/// Only the first line is considered. A security-only banner means no
/// update. The second column is split into version and release on its
/// first dash; a release containing a dash keeps it in the release part.
pub fn parse_check_update(stdout: &str) -> Option<Version> {
    let first = stdout.split('\n').next()?;
    if first.starts_with("Security:") {
        return None;
    }
    let caps = UPDATE_LINE.captures(first)?;
    let (version, release) = caps[2].split_once('-')?;
    Some(Version::new(version, release))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTALLED_INFO: &str = "\
Installed Packages
Name        : httpd
Arch        : x86_64
Version     : 2.4.6
Release     : 97.el7.centos
Size        : 9.4 M
Repo        : installed
Summary     : Apache HTTP Server
License     : ASL 2.0
Description : The Apache HTTP Server is a powerful, efficient, and extensible
            : web server.

Available Packages
Name        : httpd
Arch        : x86_64
Version     : 2.4.6
Release     : 99.el7.centos
Repo        : updates
";

    const AVAILABLE_ONLY_INFO: &str = "\
Available Packages
Name         : nginx
Version      : 1.20.1
Release      : 14.el9
Architecture : x86_64
Repository   : appstream
Summary      : A high performance web server
";

    const DNF_INSTALLED_INFO: &str = "\
Installed Packages
Name         : openssh-server
Version      : 8.7p1
Release      : 34.el9
Architecture : x86_64
From repo    : baseos
Repository   : @System
";

    #[test]
    fn test_continuation_line_appended_with_space() {
        let fields = parse_info_fields(INSTALLED_INFO.lines().skip(1));
        assert_eq!(
            fields["Description"],
            "The Apache HTTP Server is a powerful, efficient, and extensible web server."
        );
    }

    #[test]
    fn test_stops_at_available_marker() {
        let fields = parse_info_fields(INSTALLED_INFO.lines().skip(1));
        assert_eq!(fields["Release"], "97.el7.centos");
        assert_eq!(fields["Repo"], "installed");
    }

    #[test]
    fn test_parse_info_installed() {
        let info = parse_info(INSTALLED_INFO);
        assert_eq!(info.state, PackageState::Installed);
        assert_eq!(info.version, Some(Version::new("2.4.6", "97.el7.centos")));
    }

    #[test]
    fn test_parse_info_available_only_is_removed() {
        // The marker is the skipped first line, so fields are read
        let info = parse_info(AVAILABLE_ONLY_INFO);
        assert_eq!(info.state, PackageState::Removed);
        assert_eq!(info.version, Some(Version::new("1.20.1", "14.el9")));
    }

    #[test]
    fn test_parse_info_system_repo_is_installed() {
        let info = parse_info(DNF_INSTALLED_INFO);
        assert_eq!(info.state, PackageState::Installed);
    }

    #[test]
    fn test_parse_info_unknown_package() {
        assert_eq!(parse_info(""), PackageInfo::removed());
        assert_eq!(
            parse_info("Error: No matching Packages to list\n"),
            PackageInfo::removed()
        );
    }

    #[test]
    fn test_check_update_line() {
        let out = "httpd.x86_64                2.4.6-99.el7.centos          updates\n";
        assert_eq!(
            parse_check_update(out),
            Some(Version::new("2.4.6", "99.el7.centos"))
        );
    }

    #[test]
    fn test_check_update_first_dash_split() {
        let out = "kernel.x86_64   5.14.0-362.8.1-rt.el9   baseos\n";
        assert_eq!(
            parse_check_update(out),
            Some(Version::new("5.14.0", "362.8.1-rt.el9"))
        );
    }

    #[test]
    fn test_check_update_security_banner_and_empty() {
        assert_eq!(
            parse_check_update("Security: kernel-3.10.0 is an installed security update\n"),
            None
        );
        assert_eq!(parse_check_update(""), None);
        assert_eq!(parse_check_update("pkg.noarch 1.0 repo"), None);
    }
}
