//! # orchestrator
//!
//! Client side of the orchestrator API used during reconciliation.
//!
//! This crate provides:
//! - [`SettingsStore`]: environment-scoped settings, with an HTTP [`Client`]
//!   implementation and [`MemorySettings`] for tests
//! - Helpers for the agent routing map setting
//! - A [`blobstore::ContentStore`] implementation over HTTP
//!
//! # Testing
//!
//! Use [`MemorySettings`] for testing without network access:
//!
//! ```
//! use orchestrator::{AgentMap, MemorySettings, load_agent_map, store_agent_map};
//!
//! let settings = MemorySettings::new();
//! let mut map = AgentMap::new();
//! map.insert("worker1".to_string(), "ssh://root@10.0.0.5".to_string());
//! store_agent_map(&settings, "dev", &map).unwrap();
//!
//! assert_eq!(load_agent_map(&settings, "dev").unwrap(), map);
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod settings;

pub use client::Client;
pub use error::{Error, Result};
pub use settings::{
    AUTOSTART_AGENT_MAP, AgentMap, MemorySettings, SettingsStore, load_agent_map,
    store_agent_map,
};
