//! Change-set display for dry runs and `converge diff`

use std::collections::BTreeMap;

use blobstore::ContentStore;
use colored::Colorize;
use declarative::{Outcome, Report, ResourceKind, Value};
use similar::{ChangeTag, TextDiff};

/// What a report would do to its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Remove,
    Modify,
}

impl ChangeKind {
    /// Classify a report; `None` when it has nothing to show
    pub fn of(report: &Report) -> Option<Self> {
        if report.changes.is_empty() {
            return None;
        }
        match report.changes.get("purged").map(|c| &c.desired) {
            Some(Value::Bool(false)) => Some(Self::Create),
            Some(Value::Bool(true)) => Some(Self::Remove),
            _ => match report.changes.get("state").and_then(|c| c.desired.as_str()) {
                Some("removed") => Some(Self::Remove),
                _ => Some(Self::Modify),
            },
        }
    }

    fn symbol(self) -> colored::ColoredString {
        match self {
            Self::Create => "+".green(),
            Self::Remove => "-".red(),
            Self::Modify => "~".yellow(),
        }
    }
}

fn kind_title(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::File => "Files",
        ResourceKind::Directory => "Directories",
        ResourceKind::Symlink => "Symlinks",
        ResourceKind::Service => "Services",
        ResourceKind::Package => "Packages",
        ResourceKind::AgentConfig => "Agent routing",
    }
}

/// Attribute deviations as `name: current → desired`
pub fn describe_changes(report: &Report) -> Vec<String> {
    report
        .changes
        .iter()
        .filter(|(name, _)| name.as_str() != "purged")
        .map(|(name, change)| match &change.current {
            Some(current) => format!("{name}: {current} → {}", change.desired),
            None => format!("{name}: {}", change.desired),
        })
        .collect()
}

/// Display pending changes grouped by resource kind
pub fn display_changes(reports: &[Report]) {
    let pending: Vec<(&Report, ChangeKind)> = reports
        .iter()
        .filter_map(|r| ChangeKind::of(r).map(|k| (r, k)))
        .collect();
    let failed: Vec<&Report> = reports
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Failed { .. }))
        .collect();

    if pending.is_empty() && failed.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    let mut by_kind: BTreeMap<ResourceKind, Vec<(&Report, ChangeKind)>> = BTreeMap::new();
    for (report, change) in &pending {
        by_kind.entry(report.kind).or_default().push((report, *change));
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Pending Changes".bold()
    );
    println!("│");

    for (kind, entries) in &by_kind {
        println!("│ {}", kind_title(*kind).bold());
        for (report, change) in entries {
            println!("│   {} {:<30} {}", change.symbol(), report.id, report.handler.dimmed());
            for line in describe_changes(report) {
                println!("│       {}", line.dimmed());
            }
        }
        println!("│");
    }

    if !failed.is_empty() {
        println!("│ {}", "Could not check".red().bold());
        for report in &failed {
            if let Outcome::Failed { error } = &report.outcome {
                println!("│   {} {:<30} {}", "✗".red(), report.resource_ref(), error.dimmed());
            }
        }
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes, {} failed checks",
        pending.len().to_string().bold(),
        failed.len().to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

// ============================================================================
// Content diffs
// ============================================================================

/// Unified-style lines between two texts, only the changed ones
pub fn text_diff(old: &str, new: &str) -> Vec<(ChangeTag, String)> {
    TextDiff::from_lines(old, new)
        .iter_all_changes()
        .filter(|c| c.tag() != ChangeTag::Equal)
        .map(|c| (c.tag(), c.to_string_lossy().trim_end_matches('\n').to_string()))
        .collect()
}

/// Show content changes of file reports, fetching both sides from the store
pub fn display_content_diffs(reports: &[Report], store: &dyn ContentStore) {
    for report in reports.iter().filter(|r| r.kind == ResourceKind::File) {
        let Some(change) = report.changes.get("hash") else {
            continue;
        };
        let (Some(Value::Text(old)), Value::Text(new)) = (&change.current, &change.desired) else {
            continue;
        };
        let (Ok(old_bytes), Ok(new_bytes)) = (store.download(old), store.download(new)) else {
            log::debug!("{}: content not available for diff", report.resource_ref());
            continue;
        };

        println!();
        println!("  {}", report.id.bold());
        let (Ok(old_text), Ok(new_text)) =
            (String::from_utf8(old_bytes), String::from_utf8(new_bytes))
        else {
            println!("    {}", "(binary content differs)".dimmed());
            continue;
        };
        for (tag, line) in text_diff(&old_text, &new_text) {
            match tag {
                ChangeTag::Delete => println!("    {}", format!("- {line}").red()),
                ChangeTag::Insert => println!("    {}", format!("+ {line}").green()),
                ChangeTag::Equal => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::ChangeSet;

    fn report(changes: ChangeSet) -> Report {
        Report {
            id: "/etc/motd".into(),
            kind: ResourceKind::File,
            handler: "posix_file".into(),
            outcome: Outcome::skipped("dry run"),
            changes,
        }
    }

    #[test]
    fn test_change_kind() {
        let mut create = ChangeSet::new();
        create.insert("purged", Some(Value::Bool(true)), Value::Bool(false));
        assert_eq!(ChangeKind::of(&report(create)), Some(ChangeKind::Create));

        let mut remove = ChangeSet::new();
        remove.insert("purged", Some(Value::Bool(false)), Value::Bool(true));
        assert_eq!(ChangeKind::of(&report(remove)), Some(ChangeKind::Remove));

        let mut package = ChangeSet::new();
        package.insert("state", Some(Value::from("installed")), Value::from("removed"));
        assert_eq!(ChangeKind::of(&report(package)), Some(ChangeKind::Remove));

        let mut modify = ChangeSet::new();
        modify.insert("permissions", Some(Value::Int(600)), Value::Int(644));
        assert_eq!(ChangeKind::of(&report(modify)), Some(ChangeKind::Modify));

        assert_eq!(ChangeKind::of(&report(ChangeSet::new())), None);
    }

    #[test]
    fn test_describe_changes_hides_purged_marker() {
        let mut changes = ChangeSet::new();
        changes.insert("purged", Some(Value::Bool(true)), Value::Bool(false));
        changes.insert("owner", None, Value::from("nginx"));
        changes.insert("permissions", Some(Value::Int(600)), Value::Int(644));
        assert_eq!(
            describe_changes(&report(changes)),
            vec!["owner: nginx", "permissions: 600 → 644"]
        );
    }

    #[test]
    fn test_text_diff_only_changed_lines() {
        let diff = text_diff("a\nb\nc\n", "a\nB\nc\nd\n");
        assert_eq!(
            diff,
            vec![
                (ChangeTag::Delete, "b".to_string()),
                (ChangeTag::Insert, "B".to_string()),
                (ChangeTag::Insert, "d".to_string()),
            ]
        );
    }
}
