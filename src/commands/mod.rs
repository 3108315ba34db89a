pub mod apply;
pub mod diff;
pub mod handlers;
pub mod store;

use anyhow::{Context as AnyhowContext, Result};
use std::path::Path;
use std::sync::Arc;

use blobstore::ContentStore;
use declarative::{Plan, Selection};

use crate::Context;
use crate::config::ConvergeConfig;
use crate::handler::{Collaborators, build_registry};
use crate::host::LocalIo;
use crate::prepare::Preparer;

/// Everything a pass needs, built once from the agent config
pub struct Session {
    pub config: ConvergeConfig,
    pub store: Arc<dyn ContentStore>,
    pub io: LocalIo,
    pub selection: Selection,
}

impl Session {
    pub fn open(ctx: &Context) -> Result<Self> {
        let config = ConvergeConfig::load(ctx.config.as_deref())?;
        Self::from_config(config)
    }

    /// Open the stores and probe handlers on this host
    pub fn from_config(config: ConvergeConfig) -> Result<Self> {
        let store = config.content_store()?;
        let io = LocalIo::new(config.command_timeout());
        let settings = config.settings();
        if settings.is_none() {
            log::debug!("No orchestrator environment configured, agent_config disabled");
        }
        let registry = build_registry(Collaborators {
            store: Arc::clone(&store),
            settings,
        });
        let selection = registry.resolve(&io);
        Ok(Self {
            config,
            store,
            io,
            selection,
        })
    }

    /// Read descriptors, narrow to `target` and resolve declared content
    pub fn load_plan(&self, path: &Path, target: Option<&str>) -> Result<Plan> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read descriptors: {}", path.display()))?;
        let plan = Plan::from_json(&json)
            .with_context(|| format!("Invalid descriptors: {}", path.display()))?
            .filter_by_target(target);
        log::info!("Loaded {} descriptors from {}", plan.len(), path.display());

        Preparer::new(self.store.as_ref(), self.config.content.separator.as_str())
            .prepare_plan(plan)
    }

    /// Worker count from the command line, else from config
    pub fn jobs(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.config.jobs).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::ResourceKind;
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> Session {
        let config = ConvergeConfig::parse(&format!(
            "jobs = 2\n[store]\npath = \"{}\"\n",
            dir.path().join("objects").display()
        ))
        .unwrap();
        Session::from_config(config).unwrap()
    }

    #[test]
    fn test_load_plan_resolves_content_and_target() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);
        let descriptors = dir.path().join("resources.json");
        std::fs::write(
            &descriptors,
            r#"[
                {"kind": "file", "id": "/etc/motd",
                 "attributes": {"path": "/etc/motd", "content": "welcome\n"}},
                {"kind": "service", "id": "nginx",
                 "attributes": {"name": "nginx", "state": "running"}}
            ]"#,
        )
        .unwrap();

        let plan = session.load_plan(&descriptors, Some("file")).unwrap();
        assert_eq!(plan.len(), 1);
        let file = &plan.descriptors[0];
        assert_eq!(file.kind(), ResourceKind::File);
        assert!(!file.has("content"));

        let hash = file.text("hash").unwrap();
        assert_eq!(session.store.download(hash).unwrap(), b"welcome\n");
    }

    #[test]
    fn test_load_plan_errors() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);
        assert!(session.load_plan(&dir.path().join("missing.json"), None).is_err());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"kind": "file"}"#).unwrap();
        assert!(session.load_plan(&bad, None).is_err());
    }

    #[test]
    fn test_jobs() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);
        assert_eq!(session.jobs(None), 2);
        assert_eq!(session.jobs(Some(8)), 8);
        assert_eq!(session.jobs(Some(0)), 1);
    }
}
