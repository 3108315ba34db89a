//! Execution engine - reconciles a plan with parallel workers

use rayon::prelude::*;

use crate::context::{HandlerContext, OutcomeReporter, Report};
use crate::descriptor::ResourceDescriptor;
use crate::diff::ChangeSet;
use crate::error::{Error, Result};
use crate::io::HostIo;
use crate::planner::Plan;
use crate::registry::Selection;
use crate::types::{ExecuteOptions, ExecuteSummary, Outcome};

/// Reports and totals of one pass
#[derive(Debug, Clone, Default)]
pub struct PassResult {
    /// One report per descriptor, in plan order
    pub reports: Vec<Report>,
    pub summary: ExecuteSummary,
}

/// Reconcile every descriptor in `plan`
///
/// Each resource runs sequentially inside one worker; up to `opts.jobs`
/// resources run at once. Errors never abort the pass: they become a
/// `Failed` report for that resource. Whether to retry is up to the caller.
pub fn execute(
    plan: &Plan,
    selection: &Selection,
    io: &dyn HostIo,
    opts: &ExecuteOptions,
    reporter: &dyn OutcomeReporter,
) -> Result<PassResult> {
    reporter.on_pass_start(plan.len(), opts.dry_run);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .map_err(|e| Error::Other(format!("failed to create thread pool: {e}")))?;

    let reports: Vec<Report> = pool.install(|| {
        plan.descriptors
            .par_iter()
            .map(|desired| {
                let report = reconcile_one(desired, selection, io, opts.dry_run);
                reporter.on_resource_complete(&report);
                report
            })
            .collect()
    });

    let mut summary = ExecuteSummary::default();
    for report in &reports {
        summary.add(&report.outcome);
    }
    reporter.on_pass_complete(&summary);

    Ok(PassResult { reports, summary })
}

/// Reconcile a single descriptor, folding any error into the report
pub fn reconcile_one(
    desired: &ResourceDescriptor,
    selection: &Selection,
    io: &dyn HostIo,
    dry_run: bool,
) -> Report {
    let mut report = Report {
        id: desired.id().to_string(),
        kind: desired.kind(),
        handler: String::new(),
        outcome: Outcome::Unchanged,
        changes: ChangeSet::new(),
    };

    let handler = match selection.handler_for(desired.kind()) {
        Ok(handler) => handler,
        Err(e) => {
            log::error!("{}: {e}", desired.resource_ref());
            report.outcome = Outcome::Failed {
                error: e.to_string(),
            };
            return report;
        }
    };
    report.handler = handler.name().to_string();

    let ctx = HandlerContext::new(io, desired, dry_run);
    match handler.reconcile(&ctx, desired) {
        Ok((outcome, changes)) => {
            report.outcome = outcome;
            report.changes = changes;
        }
        Err(e) => {
            log::error!("{}: {e}", desired.resource_ref());
            report.outcome = Outcome::Failed {
                error: e.to_string(),
            };
        }
    }
    report
}
