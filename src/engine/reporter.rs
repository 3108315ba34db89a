//! Console reporting for a reconciliation pass

use colored::Colorize;
use declarative::{ExecuteSummary, Outcome, OutcomeReporter, Report};
use indicatif::{ProgressBar, ProgressStyle};

use crate::ui;

/// Progress bar plus one line per change or failure
///
/// `ProgressBar` is internally synchronized, so workers report directly.
pub struct ConsoleReporter {
    bar: ProgressBar,
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar, quiet }
    }
}

impl OutcomeReporter for ConsoleReporter {
    fn on_pass_start(&self, total: usize, dry_run: bool) {
        if self.quiet {
            return;
        }
        let verb = if dry_run { "Checking" } else { "Applying" };
        self.bar
            .println(format!("  {} {verb} {total} resources...", "→".cyan()));
        self.bar.set_length(total as u64);
    }

    fn on_resource_complete(&self, report: &Report) {
        self.bar
            .set_message(format!("{} {}", ui::outcome_symbol(&report.outcome), report.id));
        self.bar.inc(1);
        if self.quiet {
            return;
        }
        match &report.outcome {
            Outcome::Failed { error } => self.bar.println(format!(
                "    {} {} {}",
                "✗".red(),
                report.resource_ref(),
                error.dimmed()
            )),
            outcome if outcome.is_change() => self.bar.println(format!(
                "    {} {} {}",
                ui::outcome_symbol(outcome),
                report.resource_ref(),
                outcome.label().dimmed()
            )),
            _ => {}
        }
    }

    fn on_pass_complete(&self, _summary: &ExecuteSummary) {
        self.bar.finish_and_clear();
    }
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Desired state applied", "✓".green().bold());
    } else {
        println!("  {} Desired state applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} resources updated", summary.updated);
    }
    if summary.purged > 0 {
        println!("    • {} resources purged", summary.purged);
    }
    if summary.unchanged > 0 {
        println!("    • {} resources unchanged", summary.unchanged);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
