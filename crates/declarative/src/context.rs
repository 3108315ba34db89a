//! Handler context and reporting callbacks
//!
//! These keep the declarative crate free of any particular UI: the binary
//! plugs in a console reporter, tests use [`NoReport`].

use serde::Serialize;

use crate::descriptor::ResourceDescriptor;
use crate::diff::ChangeSet;
use crate::error::{Error, Result};
use crate::io::HostIo;
use crate::types::{CommandOutput, ExecuteSummary, Outcome, ResourceKind};

/// Everything a handler needs for one reconciliation call
pub struct HandlerContext<'a> {
    pub io: &'a dyn HostIo,
    /// Compute changes only
    pub dry_run: bool,
    resource: String,
}

impl<'a> HandlerContext<'a> {
    pub fn new(io: &'a dyn HostIo, desired: &ResourceDescriptor, dry_run: bool) -> Self {
        Self {
            io,
            dry_run,
            resource: desired.resource_ref(),
        }
    }

    /// Resource reference for log lines, e.g. `service[nginx]`
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Run a command, logging it first; non-zero exits are returned, not raised
    pub fn run(&self, command: &str, args: &[&str]) -> Result<CommandOutput> {
        log::debug!("{}: running {} {}", self.resource, command, args.join(" "));
        let output = self.io.run(command, args)?;
        log::trace!(
            "{}: exit {} stdout={:?} stderr={:?}",
            self.resource,
            output.code,
            output.stdout,
            output.stderr
        );
        Ok(output)
    }

    /// Run a command and fail on a non-zero exit
    pub fn run_checked(&self, command: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(command, args)?;
        if !output.success() {
            return Err(Error::command_failed(command, args, &output));
        }
        Ok(output)
    }
}

/// Outcome of one resource within a pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub id: String,
    pub kind: ResourceKind,
    /// Name of the handler that reconciled it, empty if none was selected
    pub handler: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub changes: ChangeSet,
}

impl Report {
    pub fn resource_ref(&self) -> String {
        format!("{}[{}]", self.kind, self.id)
    }
}

/// Receives outcomes as a pass progresses
///
/// Called from worker threads, so implementations must be `Sync`.
pub trait OutcomeReporter: Send + Sync {
    /// Called once before any resource is reconciled
    fn on_pass_start(&self, total: usize, dry_run: bool);

    /// Called as each resource finishes
    fn on_resource_complete(&self, report: &Report);

    /// Called once at the end of the pass
    fn on_pass_complete(&self, summary: &ExecuteSummary);
}

/// Reporter that discards everything
pub struct NoReport;

impl OutcomeReporter for NoReport {
    fn on_pass_start(&self, _total: usize, _dry_run: bool) {}
    fn on_resource_complete(&self, _report: &Report) {}
    fn on_pass_complete(&self, _summary: &ExecuteSummary) {}
}
