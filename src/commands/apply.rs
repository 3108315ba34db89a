//! `converge apply` - make the host match the declared resources

use anyhow::{Result, bail};
use colored::Colorize;
use dialoguer::Confirm;

use declarative::{ExecuteOptions, NoReport, execute};

use super::Session;
use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{ConsoleReporter, differ, display_changes, print_summary};
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    ui::header("Applying Desired State");

    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let session = Session::open(ctx)?;
    let plan = session.load_plan(&args.descriptors, args.target.as_deref())?;
    if plan.is_empty() {
        ui::info("No resources to reconcile");
        return Ok(());
    }
    if ctx.verbose > 0 {
        for (kind, count) in plan.counts() {
            ui::kv(kind.as_str(), &count.to_string());
        }
    }
    let jobs = session.jobs(args.jobs);

    // Preview unless the caller already agreed
    if args.dry_run || !args.yes {
        let preview = execute(
            &plan,
            &session.selection,
            &session.io,
            &ExecuteOptions { dry_run: true, jobs },
            &NoReport,
        )?;
        display_changes(&preview.reports);

        if args.dry_run {
            println!();
            println!("  {} Dry run - no changes made", "ℹ".blue());
            if !preview.summary.is_success() {
                bail!("{} resources could not be checked", preview.summary.failed);
            }
            return Ok(());
        }

        let pending = preview
            .reports
            .iter()
            .filter(|r| differ::ChangeKind::of(r).is_some())
            .count();
        if pending == 0 && preview.summary.is_success() {
            return Ok(());
        }

        if !confirm_proceed()? {
            println!();
            println!("  {} Aborted", "✗".red());
            return Ok(());
        }
    }

    let reporter = ConsoleReporter::new(ctx.quiet);
    let result = execute(
        &plan,
        &session.selection,
        &session.io,
        &ExecuteOptions {
            dry_run: false,
            jobs,
        },
        &reporter,
    )?;

    print_summary(&result.summary);

    if !result.summary.is_success() {
        bail!("{} resources failed to converge", result.summary.failed);
    }
    Ok(())
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}
