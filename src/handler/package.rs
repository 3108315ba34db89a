//! Packages through yum or dnf

use std::path::Path;

use declarative::{
    Attributes, ChangeSet, CommandOutput, DiffHandler, Error, HandlerContext, HostIo, Outcome,
    ResourceDescriptor, Result, Value,
};
use pkgkit::{Action, DesiredState, ErrorCategory, PackageInfo, PackageState, PackageTool};

pub struct YumPackage;

impl YumPackage {
    fn tool(io: &dyn HostIo) -> Result<PackageTool> {
        PackageTool::detect(|p| io.file_exists(Path::new(p))).ok_or_else(|| Error::Tool {
            tool: "yum".to_string(),
            message: "neither yum nor dnf is installed".to_string(),
        })
    }

    fn yum(&self, ctx: &HandlerContext, action: Action, name: &str) -> Result<CommandOutput> {
        let tool = Self::tool(ctx.io)?;
        ctx.run(tool.path(), &tool.args(action, name))
    }

    /// Run a changing action; any non-zero exit is a hard error
    fn yum_checked(&self, ctx: &HandlerContext, action: Action, name: &str) -> Result<()> {
        let tool = Self::tool(ctx.io)?;
        let args = tool.args(action, name);
        let output = ctx.run(tool.path(), &args)?;
        if output.success() {
            return Ok(());
        }
        let classified = pkgkit::Error::from_yum_output(&output.stdout, &output.stderr, name);
        match classified.category() {
            ErrorCategory::Other => Err(Error::command_failed(tool.path(), &args, &output)),
            category => Err(Error::Tool {
                tool: tool.path().to_string(),
                message: format!("{classified} ({})", category.advice()),
            }),
        }
    }

    /// Installed state, version and offered update
    ///
    /// Update availability is only queried for packages a repository knows.
    fn info(&self, ctx: &HandlerContext, name: &str) -> Result<PackageInfo> {
        let mut info = pkgkit::parse_info(&self.yum(ctx, Action::Info, name)?.stdout);
        if info.version.is_some() {
            // check-update exits 100 when an update exists
            let output = self.yum(ctx, Action::CheckUpdate, name)?;
            info.update = pkgkit::parse_check_update(&output.stdout);
        }
        Ok(info)
    }
}

fn desired_state(desired: &ResourceDescriptor) -> Result<DesiredState> {
    if desired.purged {
        return Ok(DesiredState::Removed);
    }
    match desired.opt_text("state")? {
        None => Ok(DesiredState::Installed),
        Some(state) => state.parse().map_err(|e: pkgkit::Error| Error::InvalidAttribute {
            attribute: "state".to_string(),
            message: e.to_string(),
        }),
    }
}

fn version_text(info: &PackageInfo) -> Option<Value> {
    info.version.as_ref().map(|v| Value::Text(v.to_string()))
}

impl DiffHandler for YumPackage {
    fn name(&self) -> &'static str {
        "yum"
    }

    fn available(&self, io: &dyn HostIo) -> bool {
        Self::tool(io).is_ok()
    }

    fn check(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<Attributes> {
        let info = self.info(ctx, desired.id())?;
        let mut attrs = Attributes::new();
        attrs.insert("state".to_string(), Value::from(info.state.as_str()));
        if let Some(version) = version_text(&info) {
            attrs.insert("version".to_string(), version);
        }
        if let Some(update) = &info.update {
            attrs.insert("update".to_string(), Value::Text(update.to_string()));
        }
        Ok(attrs)
    }

    /// A state change takes precedence: installing also updates
    fn list_changes(&self, desired: &ResourceDescriptor, current: &Attributes) -> Result<ChangeSet> {
        let wanted = desired_state(desired)?;
        let state = current.get("state");
        let installed = state.and_then(Value::as_str) == Some(PackageState::Installed.as_str());

        let mut changes = ChangeSet::new();
        match wanted {
            DesiredState::Removed if installed => {
                changes.insert("state", state.cloned(), Value::from("removed"));
            }
            DesiredState::Installed | DesiredState::Latest if !installed => {
                changes.insert("state", state.cloned(), Value::from("installed"));
            }
            DesiredState::Latest => {
                if let Some(update) = current.get("update") {
                    changes.insert("version", current.get("version").cloned(), update.clone());
                }
            }
            _ => {}
        }
        Ok(changes)
    }

    fn apply(
        &self,
        ctx: &HandlerContext,
        desired: &ResourceDescriptor,
        changes: &ChangeSet,
    ) -> Result<Outcome> {
        let name = desired.id();
        if let Some(change) = changes.get("state") {
            if change.desired.as_str() == Some("removed") {
                self.yum_checked(ctx, Action::Remove, name)?;
                return Ok(Outcome::Purged);
            }
            self.yum_checked(ctx, Action::Install, name)?;
            self.yum_checked(ctx, Action::Update, name)?;
            return Ok(Outcome::Created);
        }
        if changes.contains("version") {
            self.yum_checked(ctx, Action::Update, name)?;
            return Ok(Outcome::Updated);
        }
        Ok(Outcome::Unchanged)
    }
}
