//! Output format types for CLI commands.

use std::fmt::Write as _;

use clap::ValueEnum;

use crate::pipeline::BuildOutcome;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// The JSON diagnostics report on stdout
    Json,
}

/// Diagnostics, errors first, followed by a summary line.
pub fn render_human(outcome: &BuildOutcome) -> String {
    let mut out = String::new();
    for diagnostic in outcome.log.sorted() {
        let _ = writeln!(out, "{diagnostic}");
    }
    if !outcome.log.is_empty() {
        out.push('\n');
    }

    let links = outcome.links;
    let snippets = outcome.snippets;
    let _ = writeln!(
        out,
        "{} document(s), {} link(s) ({} broken, {} external), {} snippet(s) ({} passed, {} failed, {} timed out, {} unverified, {} skipped)",
        outcome.documents,
        links.resolved + links.broken + links.external,
        links.broken,
        links.external,
        snippets.total(),
        snippets.passed,
        snippets.failed,
        snippets.timed_out,
        snippets.unverified,
        snippets.skipped,
    );
    if let Some(site) = &outcome.site {
        let _ = writeln!(
            out,
            "Wrote {} page(s) and {} asset(s)",
            site.pages_written, site.assets_copied
        );
    }
    let _ = write!(
        out,
        "Found {} error(s), {} warning(s)",
        outcome.log.error_count(),
        outcome.log.warning_count()
    );
    if outcome.cancelled {
        out.push_str(" (cancelled; results are partial)");
    }
    out
}
