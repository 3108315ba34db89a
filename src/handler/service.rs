//! Services under systemd or legacy SysV init
//!
//! Both handlers track only `state` (running/stopped) and `onboot`. A purged
//! service is wanted stopped and disabled.

use std::path::Path;

use declarative::{
    Attributes, ChangeSet, DiffHandler, Error, HandlerContext, HostIo, Outcome,
    ResourceDescriptor, Result, Value,
};
use initkit::{Action, ServiceState, ServiceStatus, Systemctl, Sysv, is_failure};

fn exists_on(io: &dyn HostIo) -> impl Fn(&str) -> bool + '_ {
    move |p| io.file_exists(Path::new(p))
}

/// Declared state and boot enablement, `None` where not declared
fn desired_status(desired: &ResourceDescriptor) -> Result<(Option<ServiceState>, Option<bool>)> {
    if desired.purged {
        return Ok((Some(ServiceState::Stopped), Some(false)));
    }
    let state = desired
        .opt_text("state")?
        .map(str::parse::<ServiceState>)
        .transpose()
        .map_err(|e| Error::InvalidAttribute {
            attribute: "state".to_string(),
            message: e.to_string(),
        })?;
    let onboot = if desired.has("onboot") {
        Some(desired.bool("onboot")?)
    } else {
        None
    };
    Ok((state, onboot))
}

fn status_attributes(status: ServiceStatus) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("state".to_string(), Value::from(status.state.as_str()));
    attrs.insert("onboot".to_string(), Value::Bool(status.onboot));
    attrs
}

/// Changes from a `check` snapshot; only declared facets are compared
fn service_changes(desired: &ResourceDescriptor, current: &Attributes) -> Result<ChangeSet> {
    let (state, onboot) = desired_status(desired)?;
    let mut changes = ChangeSet::new();
    if let Some(state) = state {
        let wanted = Value::from(state.as_str());
        let actual = current.get("state");
        if actual != Some(&wanted) {
            changes.insert("state", actual.cloned(), wanted);
        }
    }
    if let Some(onboot) = onboot {
        let actual = current.get("onboot");
        if actual != Some(&Value::Bool(onboot)) {
            changes.insert("onboot", actual.cloned(), Value::Bool(onboot));
        }
    }
    Ok(changes)
}

/// Actions for a change-set: start/stop first, then boot enablement
fn planned_actions(changes: &ChangeSet) -> Vec<Action> {
    let mut actions = Vec::new();
    if let Some(change) = changes.get("state") {
        let state = match change.desired.as_str() {
            Some("stopped") => ServiceState::Stopped,
            _ => ServiceState::Running,
        };
        actions.push(Action::for_state(state));
    }
    if let Some(change) = changes.get("onboot") {
        actions.push(Action::for_onboot(change.desired.as_bool().unwrap_or(false)));
    }
    actions
}

/// Run an action; a non-zero exit or the tool's failure marker is an error
fn run_action(
    ctx: &HandlerContext,
    name: &str,
    action: Action,
    command: &str,
    args: &[&str],
) -> Result<()> {
    let output = ctx.run(command, args)?;
    if !output.success() || is_failure(&output.stderr) || is_failure(&output.stdout) {
        let combined = output.combined();
        let err = initkit::Error::ActionFailed {
            action: action.as_str().to_string(),
            service: name.to_string(),
            message: if combined.is_empty() {
                format!("exit code {}", output.code)
            } else {
                combined
            },
        };
        return Err(Error::Tool {
            tool: command.to_string(),
            message: err.to_string(),
        });
    }
    Ok(())
}

fn not_found(name: &str) -> Error {
    Error::not_found(initkit::Error::NotFound(name.to_string()).to_string())
}

// ============================================================================
// systemd
// ============================================================================

pub struct SystemdService;

impl SystemdService {
    fn systemctl(io: &dyn HostIo) -> Result<Systemctl> {
        Systemctl::detect(exists_on(io)).ok_or_else(|| Error::Tool {
            tool: "systemctl".to_string(),
            message: "not installed".to_string(),
        })
    }
}

impl DiffHandler for SystemdService {
    fn name(&self) -> &'static str {
        "systemd"
    }

    fn available(&self, io: &dyn HostIo) -> bool {
        Systemctl::detect(exists_on(io)).is_some()
    }

    fn check(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<Attributes> {
        Ok(status_attributes(self.status(ctx, desired.id())?))
    }

    fn list_changes(&self, desired: &ResourceDescriptor, current: &Attributes) -> Result<ChangeSet> {
        service_changes(desired, current)
    }

    fn apply(
        &self,
        ctx: &HandlerContext,
        desired: &ResourceDescriptor,
        changes: &ChangeSet,
    ) -> Result<Outcome> {
        let systemctl = Self::systemctl(ctx.io)?;
        let unit = Systemctl::unit(desired.id());
        for action in planned_actions(changes) {
            let args = Systemctl::action_args(action, &unit);
            run_action(ctx, desired.id(), action, systemctl.path(), &args)?;
        }
        Ok(Outcome::Updated)
    }

    fn can_reload(&self) -> bool {
        true
    }

    fn reload(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
        let systemctl = Self::systemctl(ctx.io)?;
        let unit = Systemctl::unit(desired.id());
        log::info!("{}: reloading with reload-or-restart", ctx.resource());
        ctx.run_checked(
            systemctl.path(),
            &Systemctl::action_args(Action::Reload, &unit),
        )?;
        Ok(())
    }
}

impl SystemdService {
    fn status(&self, ctx: &HandlerContext, name: &str) -> Result<ServiceStatus> {
        let systemctl = Self::systemctl(ctx.io)?;
        let unit = Systemctl::unit(name);

        let status = ctx.run(systemctl.path(), &Systemctl::status_args(&unit))?;
        if initkit::systemd::status_means_missing(&status.combined()) {
            return Err(not_found(name));
        }
        let active = ctx.run(systemctl.path(), &Systemctl::is_active_args(&unit))?;
        let enabled = ctx.run(systemctl.path(), &Systemctl::is_enabled_args(&unit))?;
        Ok(ServiceStatus {
            state: ServiceState::from_exit_code(active.code),
            onboot: enabled.success(),
        })
    }
}

// ============================================================================
// SysV (service + chkconfig)
// ============================================================================

pub struct SysvService;

impl SysvService {
    fn status(&self, ctx: &HandlerContext, name: &str) -> Result<ServiceStatus> {
        let listing = ctx.run(initkit::sysv::CHKCONFIG, &Sysv::list_args(name))?;
        if initkit::sysv::listing_means_missing(&listing.combined()) {
            return Err(not_found(name));
        }
        let running = ctx.run(initkit::sysv::SERVICE, &Sysv::status_args(name))?;
        Ok(ServiceStatus {
            state: ServiceState::from_exit_code(running.code),
            onboot: initkit::sysv::listing_enabled(&listing.stdout),
        })
    }
}

impl DiffHandler for SysvService {
    fn name(&self) -> &'static str {
        "redhat_service"
    }

    fn available(&self, io: &dyn HostIo) -> bool {
        Sysv::detect(exists_on(io)).is_some()
    }

    fn check(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<Attributes> {
        Ok(status_attributes(self.status(ctx, desired.id())?))
    }

    fn list_changes(&self, desired: &ResourceDescriptor, current: &Attributes) -> Result<ChangeSet> {
        service_changes(desired, current)
    }

    fn apply(
        &self,
        ctx: &HandlerContext,
        desired: &ResourceDescriptor,
        changes: &ChangeSet,
    ) -> Result<Outcome> {
        for action in planned_actions(changes) {
            let (command, args) = Sysv::action_command(action, desired.id());
            run_action(ctx, desired.id(), action, command, &args)?;
        }
        Ok(Outcome::Updated)
    }

    fn can_reload(&self) -> bool {
        true
    }

    fn reload(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
        let (command, args) = Sysv::action_command(Action::Reload, desired.id());
        ctx.run_checked(command, &args)?;
        Ok(())
    }
}
