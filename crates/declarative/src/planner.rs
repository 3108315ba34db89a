//! Pass planner - the list of descriptors to reconcile

use std::collections::BTreeMap;

use crate::descriptor::{ResourceDescriptor, parse_descriptors};
use crate::error::Result;
use crate::types::ResourceKind;

/// Descriptors for one reconciliation pass, in declared order
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub descriptors: Vec<ResourceDescriptor>,
}

impl Plan {
    pub fn new(descriptors: Vec<ResourceDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Build a plan from a JSON array of descriptors
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(parse_descriptors(json)?))
    }

    /// Keep only descriptors matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&ResourceDescriptor) -> bool,
    {
        Self {
            descriptors: self.descriptors.into_iter().filter(|d| predicate(d)).collect(),
        }
    }

    /// Keep only descriptors matching a target pattern
    ///
    /// Target format: "kind" or "kind:id"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, id) = parse_target(t);
                self.filter(|d| matches_filter(d, kind.as_deref(), id.as_deref()))
            }
        }
    }

    /// Number of descriptors per kind
    pub fn counts(&self) -> BTreeMap<ResourceKind, usize> {
        let mut counts = BTreeMap::new();
        for d in &self.descriptors {
            *counts.entry(d.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Parse a target string like "kind:id" into (kind, id)
///
/// The id may itself contain colons; only the first one separates.
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once(':') {
        Some((kind, id)) if kind.is_empty() => (None, Some(id.to_string())),
        Some((kind, id)) => (Some(kind.to_string()), Some(id.to_string())),
        None => (Some(target.to_string()), None),
    }
}

/// Check if a descriptor matches the filter
fn matches_filter(d: &ResourceDescriptor, kind: Option<&str>, id: Option<&str>) -> bool {
    let kind_matches = match kind {
        None => true,
        Some(k) => match k.parse::<ResourceKind>() {
            Ok(parsed) => parsed == d.kind(),
            Err(_) => false,
        },
    };
    let id_matches = match id {
        None => true,
        Some(id) => d.id() == id,
    };
    kind_matches && id_matches
}
