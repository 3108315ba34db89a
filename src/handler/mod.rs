//! Concrete reconcilers for each resource kind
//!
//! Candidates are registered in priority order; the registry keeps the first
//! one whose availability probe passes on this host.

mod agent_config;
mod directory;
mod file;
mod package;
mod service;
mod symlink;

use std::path::Path;
use std::sync::Arc;

use blobstore::ContentStore;
use declarative::{
    Attributes, Error, FileStat, Handler, HandlerContext, HandlerRegistry, ResourceDescriptor,
    ResourceKind, Result, Value, mode_from_digits, mode_to_digits,
};
use orchestrator::SettingsStore;

use agent_config::AgentConfigHandler;
use directory::DirectoryHandler;
use file::FileHandler;
use package::YumPackage;
use service::{SystemdService, SysvService};
use symlink::SymlinkHandler;

/// Remote collaborators handlers need
pub struct Collaborators {
    pub store: Arc<dyn ContentStore>,
    /// Settings store and environment, when an orchestrator is configured
    pub settings: Option<(Arc<dyn SettingsStore>, String)>,
}

/// Every handler this agent knows, in priority order per kind
pub fn build_registry(deps: Collaborators) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(
        ResourceKind::File,
        Handler::crud(FileHandler::new(Arc::clone(&deps.store))),
    );
    registry.register(ResourceKind::Directory, Handler::crud(DirectoryHandler));
    registry.register(ResourceKind::Symlink, Handler::crud(SymlinkHandler));
    registry.register(ResourceKind::Service, Handler::diff(SystemdService));
    registry.register(ResourceKind::Service, Handler::diff(SysvService));
    registry.register(ResourceKind::Package, Handler::diff(YumPackage));
    registry.register(
        ResourceKind::AgentConfig,
        Handler::crud(AgentConfigHandler::new(deps.settings)),
    );
    registry
}

// ============================================================================
// Helpers shared by the filesystem handlers
// ============================================================================

fn path_of(desired: &ResourceDescriptor) -> &Path {
    Path::new(desired.id())
}

/// Owner, group and permissions as attribute values
fn stat_attributes(stat: &FileStat) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("owner".to_string(), Value::Text(stat.owner.clone()));
    attrs.insert("group".to_string(), Value::Text(stat.group.clone()));
    attrs.insert(
        "permissions".to_string(),
        Value::Int(mode_to_digits(stat.permissions)),
    );
    attrs
}

/// chmod to the declared permissions, if any
fn apply_permissions(ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
    if !desired.has("permissions") {
        return Ok(());
    }
    let mode = mode_from_digits(desired.int("permissions")?)?;
    let path = path_of(desired);
    log::debug!("{}: chmod {mode:o}", ctx.resource());
    ctx.io.chmod(path, mode)
}

/// chown to the declared owner and/or group, if any
fn apply_ownership(ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
    let owner = desired.opt_text("owner")?;
    let group = desired.opt_text("group")?;
    if owner.is_none() && group.is_none() {
        return Ok(());
    }
    log::debug!(
        "{}: chown {}:{}",
        ctx.resource(),
        owner.unwrap_or(""),
        group.unwrap_or("")
    );
    ctx.io.chown(path_of(desired), owner, group)
}

/// Map a content store failure into the reconciliation taxonomy
fn store_error(err: blobstore::Error) -> Error {
    match err {
        blobstore::Error::IntegrityMismatch { expected, actual } => {
            Error::IntegrityMismatch { expected, actual }
        }
        blobstore::Error::NotFound(hash) => Error::not_found(format!("content {hash}")),
        other => Error::Store(other.to_string()),
    }
}
