//! Display formatting for CLI output

use console::{Style, style};

use driftguard_core::{Action, ChangeSet, ChangeSetEntry};

/// Style for an action label
fn action_style(action: Action) -> Style {
    match action {
        Action::Created => Style::new().green().bold(),
        Action::Configured => Style::new().yellow().bold(),
        Action::Unchanged => Style::new().dim(),
    }
}

/// Style for one line of a unified diff
fn diff_line_style(line: &str) -> Style {
    if line.starts_with("+++") || line.starts_with("---") {
        Style::new().bold()
    } else if line.starts_with('+') {
        Style::new().green()
    } else if line.starts_with('-') {
        Style::new().red()
    } else if line.starts_with("@@") {
        Style::new().cyan()
    } else {
        Style::new().dim()
    }
}

/// Print one entry, followed by its diff if any
pub fn print_entry(entry: &ChangeSetEntry) {
    println!(
        "{} {}",
        style(&entry.subject).cyan(),
        action_style(entry.action).apply_to(entry.action)
    );

    if let Some(diff) = &entry.diff {
        for line in diff.lines() {
            println!("    {}", diff_line_style(line).apply_to(line));
        }
    }
}

/// Print every entry and a closing summary
pub fn print_changes(changes: &ChangeSet) {
    for entry in changes {
        print_entry(entry);
    }

    println!();
    if changes.has_changes() {
        println!("{}", style(changes.summary()).yellow().bold());
    } else {
        println!("{}", style(changes.summary()).green());
    }
}
