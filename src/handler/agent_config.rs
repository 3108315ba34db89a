//! Agent routing entries in the orchestrator's shared agent map
//!
//! The whole map lives in one setting, so every write is a read-modify-write
//! of all entries. Writes are serialized per environment within this process.

use std::sync::Arc;

use declarative::{
    Attributes, ChangeSet, CrudHandler, CurrentState, Error, HandlerContext, HostIo, KeyedLocks,
    ResourceDescriptor, Result, Value,
};
use orchestrator::{AUTOSTART_AGENT_MAP, AgentMap, SettingsStore, load_agent_map, store_agent_map};

pub struct AgentConfigHandler {
    settings: Option<(Arc<dyn SettingsStore>, String)>,
    locks: KeyedLocks,
}

impl AgentConfigHandler {
    pub fn new(settings: Option<(Arc<dyn SettingsStore>, String)>) -> Self {
        Self {
            settings,
            locks: KeyedLocks::new(),
        }
    }

    fn settings(&self) -> Result<(&dyn SettingsStore, &str)> {
        self.settings
            .as_ref()
            .map(|(store, env)| (store.as_ref(), env.as_str()))
            .ok_or_else(|| Error::Settings("no orchestrator configured".to_string()))
    }

    fn load(&self) -> Result<AgentMap> {
        let (store, env) = self.settings()?;
        load_agent_map(store, env).map_err(|e| Error::Settings(e.to_string()))
    }

    /// Apply `edit` to the freshly read map and write it back, under the map's lock
    fn modify(&self, edit: impl FnOnce(&mut AgentMap)) -> Result<()> {
        let (store, env) = self.settings()?;
        let key = format!("{env}/{AUTOSTART_AGENT_MAP}");
        self.locks.with_lock(&key, || {
            let mut map = load_agent_map(store, env).map_err(|e| Error::Settings(e.to_string()))?;
            edit(&mut map);
            store_agent_map(store, env, &map).map_err(|e| Error::Settings(e.to_string()))
        })
    }

    fn upsert(&self, desired: &ResourceDescriptor) -> Result<()> {
        let uri = desired.text("uri")?.to_string();
        let agent = desired.id().to_string();
        self.modify(|map| {
            map.insert(agent, uri);
        })
    }
}

impl CrudHandler for AgentConfigHandler {
    fn name(&self) -> &'static str {
        "agentrest"
    }

    fn managed(&self) -> &'static [&'static str] {
        &["uri"]
    }

    fn available(&self, _io: &dyn HostIo) -> bool {
        self.settings.is_some()
    }

    fn ignore(&self, desired: &ResourceDescriptor) -> Option<String> {
        let autostart = desired
            .get("autostart")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        (!autostart).then(|| "autostart is not enabled".to_string())
    }

    fn read(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<CurrentState> {
        let map = self.load()?;
        let Some(uri) = map.get(desired.id()) else {
            log::debug!("{}: not in the agent map", ctx.resource());
            return Ok(CurrentState::Purged);
        };
        let mut attrs = Attributes::new();
        attrs.insert("uri".to_string(), Value::Text(uri.clone()));
        Ok(CurrentState::Present(attrs))
    }

    fn create(&self, _ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
        self.upsert(desired)
    }

    fn update(
        &self,
        _ctx: &HandlerContext,
        desired: &ResourceDescriptor,
        _changes: &ChangeSet,
    ) -> Result<()> {
        self.upsert(desired)
    }

    fn delete(&self, _ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
        let agent = desired.id();
        self.modify(|map| {
            map.remove(agent);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Handler, MockIo, Outcome, ResourceKind};
    use orchestrator::MemorySettings;
    use serde_json::json;
    use std::thread;

    const ENV: &str = "prod";

    fn settings_with(initial: serde_json::Value) -> Arc<MemorySettings> {
        let settings = Arc::new(MemorySettings::new());
        settings.set(ENV, AUTOSTART_AGENT_MAP, initial).unwrap();
        settings
    }

    fn handler_for(settings: &Arc<MemorySettings>) -> AgentConfigHandler {
        AgentConfigHandler::new(Some((
            Arc::clone(settings) as Arc<dyn SettingsStore>,
            ENV.to_string(),
        )))
    }

    fn agent(name: &str, uri: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(ResourceKind::AgentConfig, name)
            .with("agentname", name)
            .with("uri", uri)
            .with("autostart", true)
    }

    fn reconcile(handler: &Handler, d: &ResourceDescriptor) -> Result<(Outcome, ChangeSet)> {
        let io = MockIo::new();
        let ctx = HandlerContext::new(&io, d, false);
        handler.reconcile(&ctx, d)
    }

    fn map(settings: &MemorySettings) -> AgentMap {
        load_agent_map(settings, ENV).unwrap()
    }

    #[test]
    fn test_update_leaves_other_entries() {
        let settings = settings_with(json!({"worker1": "uri1", "worker2": "uri3"}));
        let handler = Handler::crud(handler_for(&settings));

        let (outcome, changes) = reconcile(&handler, &agent("worker1", "uri2")).unwrap();
        assert_eq!(outcome, Outcome::Updated);
        assert!(changes.contains("uri"));

        let map = map(&settings);
        assert_eq!(map["worker1"], "uri2");
        assert_eq!(map["worker2"], "uri3");
    }

    #[test]
    fn test_create_and_converged() {
        let settings = settings_with(json!({"worker2": "uri3"}));
        let handler = Handler::crud(handler_for(&settings));

        let (outcome, _) = reconcile(&handler, &agent("worker1", "uri1")).unwrap();
        assert_eq!(outcome, Outcome::Created);
        let (outcome, _) = reconcile(&handler, &agent("worker1", "uri1")).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert_eq!(map(&settings).len(), 2);
    }

    #[test]
    fn test_delete() {
        let settings = settings_with(json!({"worker1": "uri1", "worker2": "uri3"}));
        let handler = Handler::crud(handler_for(&settings));

        let (outcome, _) = reconcile(&handler, &agent("worker1", "uri1").purged()).unwrap();
        assert_eq!(outcome, Outcome::Purged);
        assert_eq!(map(&settings).keys().collect::<Vec<_>>(), vec!["worker2"]);
    }

    #[test]
    fn test_without_autostart_is_skipped() {
        let settings = settings_with(json!({}));
        let handler = Handler::crud(handler_for(&settings));
        let d = ResourceDescriptor::new(ResourceKind::AgentConfig, "worker1")
            .with("agentname", "worker1")
            .with("uri", "uri1");

        let (outcome, _) = reconcile(&handler, &d).unwrap();
        assert!(matches!(outcome, Outcome::Skipped { .. }));
        let (outcome, _) = reconcile(&handler, &d.with("autostart", false)).unwrap();
        assert!(matches!(outcome, Outcome::Skipped { .. }));
        assert_eq!(settings.set_count(), 1);
    }

    #[test]
    fn test_malformed_map_is_settings_error() {
        let settings = settings_with(json!(["not", "a", "map"]));
        let handler = Handler::crud(handler_for(&settings));
        assert!(matches!(
            reconcile(&handler, &agent("worker1", "uri1")),
            Err(Error::Settings(_))
        ));
    }

    #[test]
    fn test_concurrent_writers_keep_every_entry() {
        let settings = settings_with(json!({}));
        let handler = Arc::new(handler_for(&settings));
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let handler = Arc::clone(&handler);
                thread::spawn(move || {
                    handler
                        .upsert(&agent(&format!("worker{i}"), &format!("uri{i}")))
                        .unwrap();
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(map(&settings).len(), 8);
    }

    #[test]
    fn test_unavailable_without_settings() {
        let handler = AgentConfigHandler::new(None);
        assert!(!handler.available(&MockIo::new()));
    }
}
