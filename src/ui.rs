//! Console output for the command-line host.

use crate::domain::VersionEvent;
use console::style;

pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// One line describing a change, e.g. `version.patch-incremented: 1.0.0 (0) → 1.0.1 (0)`.
pub fn event_line(event: &VersionEvent) -> String {
    format!(
        "{}: {} ({}) → {} ({})",
        event.kind, event.previous, event.previous.commit, event.current, event.current.commit
    )
}

/// Subscriber used by the CLI to echo events to stderr.
pub fn display_event(event: &VersionEvent) {
    eprintln!("{} {}", style("•").dim(), style(event_line(event)).dim());
}
