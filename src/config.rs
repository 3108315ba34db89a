//! Agent configuration (`config.toml`)

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use blobstore::{ContentStore, DirStore};
use orchestrator::{Client, SettingsStore};

use crate::paths;

const CONFIG_FILE: &str = "config.toml";

// ============================================================================
// Config Schema
// ============================================================================

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvergeConfig {
    /// Settings scope on the orchestrator
    pub environment: Option<String>,

    /// Resources reconciled in parallel
    pub jobs: usize,

    /// Upper bound for any external command
    pub command_timeout_secs: u64,

    pub store: StoreConfig,

    pub orchestrator: OrchestratorConfig,

    pub content: ContentConfig,
}

impl Default for ConvergeConfig {
    fn default() -> Self {
        Self {
            environment: None,
            jobs: 4,
            command_timeout_secs: 300,
            store: StoreConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            content: ContentConfig::default(),
        }
    }
}

/// Where file content lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local directory of objects
    #[default]
    Dir,
    /// Orchestrator file API
    Http,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Object directory for the `dir` backend (default: `<state dir>/objects`)
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// API base URL, e.g. `http://orchestrator:8888`
    pub url: Option<String>,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Separator between content fragments when a descriptor sets none
    pub separator: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            separator: "\n".to_string(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl ConvergeConfig {
    /// Load from an explicit path, or from the config directory
    ///
    /// A missing file in the config directory means defaults; a missing
    /// explicit path is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = paths::config_dir()?.join(CONFIG_FILE);
                if !path.exists() {
                    log::debug!("No config at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid TOML format in converge config")?;
        if config.jobs == 0 {
            bail!("jobs must be at least 1");
        }
        Ok(config)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    fn client(&self) -> Option<Client> {
        self.orchestrator
            .url
            .as_deref()
            .map(|url| Client::new(url, Duration::from_secs(self.orchestrator.timeout_secs)))
    }

    /// Object directory for the `dir` backend
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(path) => Ok(paths::expand(path)),
            None => Ok(paths::state_dir()?.join("objects")),
        }
    }

    /// Open the configured content store
    pub fn content_store(&self) -> Result<Arc<dyn ContentStore>> {
        match self.store.backend {
            StoreBackend::Dir => {
                let path = self.store_path()?;
                let store = DirStore::open(&path)
                    .with_context(|| format!("Could not open content store at {}", path.display()))?;
                Ok(Arc::new(store))
            }
            StoreBackend::Http => {
                let client = self
                    .client()
                    .context("store backend \"http\" needs [orchestrator] url")?;
                Ok(Arc::new(client))
            }
        }
    }

    /// Settings store and environment, when both are configured
    pub fn settings(&self) -> Option<(Arc<dyn SettingsStore>, String)> {
        let environment = self.environment.clone()?;
        let client = self.client()?;
        Some((Arc::new(client), environment))
    }
}
