//! Environment-scoped settings
//!
//! Settings are JSON values stored by the orchestrator under a key within an
//! environment. The agent routing map is one such setting: a JSON object
//! from agent name to connection URI.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use crate::error::{Error, Result};

/// Setting key of the agent routing map.
pub const AUTOSTART_AGENT_MAP: &str = "autostart_agent_map";

/// Agent name to connection URI.
pub type AgentMap = BTreeMap<String, String>;

/// Get/set named settings scoped to an environment.
///
/// There is no compare-and-swap: a `set` replaces the whole value.
pub trait SettingsStore: Send + Sync {
    /// Current value, `None` if the setting was never written
    fn get(&self, environment: &str, key: &str) -> Result<Option<Value>>;

    /// Replace the value
    fn set(&self, environment: &str, key: &str, value: Value) -> Result<()>;
}

/// Read the agent routing map; an unset setting is an empty map.
pub fn load_agent_map(store: &dyn SettingsStore, environment: &str) -> Result<AgentMap> {
    match store.get(environment, AUTOSTART_AGENT_MAP)? {
        None | Some(Value::Null) => Ok(AgentMap::new()),
        Some(value) => serde_json::from_value(value).map_err(|e| Error::MalformedSetting {
            key: AUTOSTART_AGENT_MAP.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Write the whole agent routing map back.
pub fn store_agent_map(store: &dyn SettingsStore, environment: &str, map: &AgentMap) -> Result<()> {
    let value = serde_json::to_value(map)?;
    store.set(environment, AUTOSTART_AGENT_MAP, value)
}

/// In-memory settings for tests.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<(String, String), Value>>,
    sets: AtomicUsize,
}

impl MemorySettings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls so far.
    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Value>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, environment: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .lock()
            .get(&(environment.to_string(), key.to_string()))
            .cloned())
    }

    fn set(&self, environment: &str, key: &str, value: Value) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.lock()
            .insert((environment.to_string(), key.to_string()), value);
        Ok(())
    }
}
