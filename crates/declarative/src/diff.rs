//! Change-set computation between current and desired attributes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::descriptor::Attributes;
use crate::types::Value;

/// One attribute deviation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Observed value, `None` when the attribute is absent on the host
    pub current: Option<Value>,
    pub desired: Value,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.current {
            Some(current) => write!(f, "{current} -> {}", self.desired),
            None => write!(f, "(none) -> {}", self.desired),
        }
    }
}

/// Set of attributes that differ; empty means converged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: BTreeMap<String, Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare every desired attribute against its current counterpart
    ///
    /// Attributes only present in `current` are not tracked.
    pub fn between(current: &Attributes, desired: &Attributes) -> Self {
        let mut set = Self::new();
        for (name, want) in desired {
            let have = current.get(name);
            if have != Some(want) {
                set.insert(name, have.cloned(), want.clone());
            }
        }
        set
    }

    pub fn insert(&mut self, name: impl Into<String>, current: Option<Value>, desired: Value) {
        self.changes
            .insert(name.into(), Change { current, desired });
    }

    pub fn get(&self, name: &str) -> Option<&Change> {
        self.changes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.changes.contains_key(name)
    }

    pub fn contains_any(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.contains(n))
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Change)> {
        self.changes.iter()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, change)) in self.changes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {change}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_identical_state_gives_empty_set() {
        let state = attrs(&[
            ("path", Value::from("/tmp/a")),
            ("hash", Value::from("H")),
            ("permissions", Value::Int(644)),
        ]);
        assert!(ChangeSet::between(&state, &state).is_empty());
    }

    #[test]
    fn test_only_desired_keys_compared() {
        let current = attrs(&[
            ("permissions", Value::Int(600)),
            ("owner", Value::from("root")),
        ]);
        let desired = attrs(&[("permissions", Value::Int(644))]);
        let set = ChangeSet::between(&current, &desired);
        assert_eq!(set.len(), 1);
        let change = set.get("permissions").unwrap();
        assert_eq!(change.current, Some(Value::Int(600)));
        assert_eq!(change.desired, Value::Int(644));
        assert!(!set.contains("owner"));
    }

    #[test]
    fn test_missing_current_attribute_is_a_change() {
        let desired = attrs(&[("group", Value::from("wheel"))]);
        let set = ChangeSet::between(&Attributes::new(), &desired);
        assert_eq!(set.to_string(), "group: (none) -> wheel");
        assert!(set.contains_any(&["owner", "group"]));
    }
}
