//! Core types for desired-state reconciliation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Marker for a desired value that is not resolvable yet
///
/// Written as `{"$deferred": "<reason>"}` in descriptor JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deferred {
    #[serde(rename = "$deferred")]
    pub reason: String,
}

/// A declared or observed attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<Value>),
    /// Must stay ahead of `Map` so the marker object is not read as a map
    Deferred(Deferred),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Create a deferred value with a reason
    pub fn deferred(reason: impl Into<String>) -> Self {
        Self::Deferred(Deferred {
            reason: reason.into(),
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Reason of the first deferred value found, searching nested values too
    pub fn deferred_reason(&self) -> Option<&str> {
        match self {
            Self::Deferred(d) => Some(&d.reason),
            Self::List(items) => items.iter().find_map(Value::deferred_reason),
            Self::Map(map) => map.values().find_map(Value::deferred_reason),
            _ => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred_reason().is_some()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Self::Deferred(d) => write!(f, "<deferred: {}>", d.reason),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Kind of managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    File,
    Directory,
    Symlink,
    Service,
    Package,
    AgentConfig,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        Self::File,
        Self::Directory,
        Self::Symlink,
        Self::Service,
        Self::Package,
        Self::AgentConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Service => "service",
            Self::Package => "package",
            Self::AgentConfig => "agent_config",
        }
    }

    /// Name of the attribute that identifies a resource of this kind
    pub fn identity_attribute(&self) -> &'static str {
        match self {
            Self::File | Self::Directory => "path",
            Self::Symlink => "target",
            Self::Service | Self::Package => "name",
            Self::AgentConfig => "agentname",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" | "files" => Ok(Self::File),
            "directory" | "directories" | "dir" | "dirs" => Ok(Self::Directory),
            "symlink" | "symlinks" => Ok(Self::Symlink),
            "service" | "services" => Ok(Self::Service),
            "package" | "packages" => Ok(Self::Package),
            "agent_config" | "agentconfig" | "agents" => Ok(Self::AgentConfig),
            other => Err(Error::Other(format!("unknown resource kind: {other}"))),
        }
    }
}

/// Outcome of reconciling one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    /// Resource did not exist and was created
    Created,
    /// Resource existed and was changed
    Updated,
    /// Resource existed and was removed
    Purged,
    /// Resource already matched the desired state
    Unchanged,
    /// Resource was intentionally not touched
    Skipped { reason: String },
    /// Reconciliation attempt failed
    Failed { error: String },
}

impl Outcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Updated | Self::Purged)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Purged => "purged",
            Self::Unchanged => "unchanged",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Summary of a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub purged: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.purged
    }

    /// Check if the pass was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.unchanged + self.skipped + self.failed
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.purged += other.purged;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Count an outcome
    pub fn add(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Purged => self.purged += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Options for a reconciliation pass
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Compute change-sets without applying them
    pub dry_run: bool,
    /// Number of parallel workers
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
        }
    }
}

/// Captured result of an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            code,
        }
    }

    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::new(stdout, "", 0)
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// stdout and stderr joined, for error reporting
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{stdout}\n{stderr}"),
        }
    }
}

/// Convert the octal-digit form used in descriptors (`644`) to mode bits (`0o644`)
pub fn mode_from_digits(digits: i64) -> Result<u32> {
    let text = digits.to_string();
    u32::from_str_radix(&text, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| Error::InvalidAttribute {
            attribute: "permissions".to_string(),
            message: format!("{digits} is not an octal file mode"),
        })
}

/// Convert mode bits (`0o644`) to the octal-digit form used in descriptors (`644`)
pub fn mode_to_digits(mode: u32) -> i64 {
    format!("{:o}", mode & 0o7777).parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_untagged_deserialize() {
        let v: Value = serde_json::from_str("true").unwrap();
        assert_eq!(v, Value::Bool(true));
        let v: Value = serde_json::from_str("644").unwrap();
        assert_eq!(v, Value::Int(644));
        let v: Value = serde_json::from_str("\"root\"").unwrap();
        assert_eq!(v, Value::Text("root".into()));
        let v: Value = serde_json::from_str(r#"{"$deferred": "ip of db"}"#).unwrap();
        assert_eq!(v, Value::deferred("ip of db"));
        let v: Value = serde_json::from_str(r#"{"value": "a", "sorting_key": "1"}"#).unwrap();
        assert!(matches!(v, Value::Map(_)));
    }

    #[test]
    fn test_deferred_nested_in_list() {
        let v = Value::List(vec![Value::from("a"), Value::deferred("later")]);
        assert_eq!(v.deferred_reason(), Some("later"));
        assert!(!Value::from("a").is_deferred());
    }

    #[test]
    fn test_mode_conversions() {
        assert_eq!(mode_from_digits(644).unwrap(), 0o644);
        assert_eq!(mode_from_digits(4755).unwrap(), 0o4755);
        assert!(mode_from_digits(648).is_err());
        assert_eq!(mode_to_digits(0o100_644), 644);
        assert_eq!(mode_to_digits(0o750), 750);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = ExecuteSummary::default();
        summary.add(&Outcome::Created);
        summary.add(&Outcome::Unchanged);
        summary.add(&Outcome::skipped("dry run"));
        summary.add(&Outcome::Failed {
            error: "boom".into(),
        });
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.total_changes(), 1);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_command_output_combined() {
        let out = CommandOutput::new("out\n", "err\n", 1);
        assert_eq!(out.combined(), "out\nerr");
        assert!(!out.success());
        assert_eq!(CommandOutput::ok("").combined(), "");
    }

    #[test]
    fn test_kind_identity_attribute() {
        assert_eq!(ResourceKind::Symlink.identity_attribute(), "target");
        assert_eq!(ResourceKind::AgentConfig.identity_attribute(), "agentname");
        assert_eq!("services".parse::<ResourceKind>().unwrap(), ResourceKind::Service);
    }
}
