//! Handler registry - ordered candidates per resource kind
//!
//! Candidates are registered in priority order. [`HandlerRegistry::resolve`]
//! runs every availability probe once and picks the first available
//! candidate per kind; unavailable candidates are dropped silently.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::io::HostIo;
use crate::types::ResourceKind;

/// Candidate handlers per resource kind
#[derive(Default)]
pub struct HandlerRegistry {
    candidates: BTreeMap<ResourceKind, Vec<Arc<Handler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate after any already registered for `kind`
    pub fn register(&mut self, kind: ResourceKind, handler: Handler) {
        self.candidates
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Candidates for `kind`, highest priority first
    pub fn candidates(&self, kind: ResourceKind) -> &[Arc<Handler>] {
        self.candidates.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Evaluate availability probes and select one handler per kind
    pub fn resolve(&self, io: &dyn HostIo) -> Selection {
        let mut selected = BTreeMap::new();
        let mut probes = Vec::new();
        for (kind, candidates) in &self.candidates {
            for handler in candidates {
                let available = handler.available(io);
                log::debug!(
                    "probe {}/{}: {}",
                    kind,
                    handler.name(),
                    if available { "available" } else { "unavailable" }
                );
                probes.push(Probe {
                    kind: *kind,
                    handler: handler.name(),
                    available,
                });
                if available && !selected.contains_key(kind) {
                    selected.insert(*kind, Arc::clone(handler));
                }
            }
        }
        Selection { selected, probes }
    }
}

/// Result of one availability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub kind: ResourceKind,
    pub handler: &'static str,
    pub available: bool,
}

/// Handlers selected for this host, valid for one pass
pub struct Selection {
    selected: BTreeMap<ResourceKind, Arc<Handler>>,
    probes: Vec<Probe>,
}

impl Selection {
    /// Selected handler for `kind`
    ///
    /// Returns `Error::Unsupported` when no candidate is available.
    pub fn handler_for(&self, kind: ResourceKind) -> Result<Arc<Handler>> {
        self.selected
            .get(&kind)
            .cloned()
            .ok_or(Error::Unsupported { kind })
    }

    /// Name of the selected handler for `kind`, if any
    pub fn selected_name(&self, kind: ResourceKind) -> Option<&'static str> {
        self.selected.get(&kind).map(|h| h.name())
    }

    /// Every probe in registration order
    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }
}
