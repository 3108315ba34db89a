//! `converge diff` - preview what apply would change

use anyhow::Result;

use declarative::{ExecuteOptions, NoReport, Outcome, execute};

use super::Session;
use crate::Context;
use crate::cli::DiffArgs;
use crate::engine::{display_changes, display_content_diffs};
use crate::ui;

pub fn run(ctx: &Context, args: &DiffArgs) -> Result<()> {
    let session = Session::open(ctx)?;
    let plan = session.load_plan(&args.descriptors, args.target.as_deref())?;

    ui::header("Converge Diff");
    ui::dim(&format!("{} resources from {}", plan.len(), args.descriptors.display()));

    let preview = execute(
        &plan,
        &session.selection,
        &session.io,
        &ExecuteOptions {
            dry_run: true,
            jobs: session.jobs(None),
        },
        &NoReport,
    )?;

    display_changes(&preview.reports);
    if !args.no_content {
        display_content_diffs(&preview.reports, session.store.as_ref());
    }

    // Deferred content, autostart off: nothing was read for these
    let unchecked = preview
        .reports
        .iter()
        .filter(|r| r.changes.is_empty() && matches!(r.outcome, Outcome::Skipped { .. }))
        .count();
    if unchecked > 0 {
        println!();
        ui::info(&format!("{unchecked} resources skipped without checking"));
    }
    Ok(())
}
