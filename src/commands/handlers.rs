//! `converge handlers` - which reconciler each resource kind gets on this host

use anyhow::Result;
use colored::Colorize;

use declarative::{Probe, ResourceKind, Selection};

use super::Session;
use crate::Context;
use crate::ui;

/// Probe rows for one kind, marking the selected handler
fn rows(selection: &Selection, kind: ResourceKind) -> Vec<(&Probe, bool)> {
    let selected = selection.selected_name(kind);
    selection
        .probes()
        .iter()
        .filter(|p| p.kind == kind)
        .map(|p| (p, selected == Some(p.handler)))
        .collect()
}

pub fn run(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;

    ui::header("Handlers");

    let mut unsupported = Vec::new();
    for kind in ResourceKind::ALL {
        ui::section(kind.as_str());
        for (probe, selected) in rows(&session.selection, kind) {
            let (symbol, status) = match (selected, probe.available) {
                (true, _) => ("●".green(), "selected".green()),
                (false, true) => ("○".dimmed(), "available".dimmed()),
                (false, false) => ("✗".red(), "unavailable".dimmed()),
            };
            println!("  {symbol} {:<18} {status}", probe.handler);
        }
        if session.selection.selected_name(kind).is_none() {
            unsupported.push(kind.as_str());
        }
    }

    println!();
    if unsupported.is_empty() {
        ui::success("Every resource kind can be reconciled on this host");
    } else {
        ui::warn(&format!(
            "No handler on this host for: {}",
            unsupported.join(", ")
        ));
    }
    Ok(())
}
