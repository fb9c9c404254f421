//! Command handlers for the CLI.

mod build;
mod check;
mod completions;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::cli::RunArgs;
use crate::cli::config::Config;
use crate::cli::output::{OutputFormat, render_human};
use crate::context::{BuildContext, default_jobs};
use crate::export::REPORT_FILE;
use crate::pipeline::{BuildOutcome, BuildSettings, run_build};

pub use build::handle_build;
pub use check::handle_check;
pub use completions::handle_completions;

// ===========================================
// Shared Utilities
// ===========================================

/// Merges config file values with command-line flags; flags win.
pub(crate) fn settings_from(args: &RunArgs, config: &Config) -> Result<BuildSettings> {
    let mut settings = BuildSettings::new(&args.root);
    if let Some(extensions) = &config.extensions {
        settings.load.extensions = extensions.clone();
    }
    // The config file is not site content.
    settings.load.exclude_files.extend(config.source().map(Path::to_path_buf));
    settings.resolve.case_insensitive =
        args.case_insensitive || config.case_insensitive.unwrap_or(false);
    if let Some(timeout) = args.timeout.or(config.snippet_timeout()?) {
        settings.validate.timeout = timeout;
    }
    settings.checkers = config.checker_registry()?;
    settings.snippets = !args.no_snippets;
    settings.severity = config.severity_policy();
    if let Some(title) = &config.site_title {
        settings.site_title = title.clone();
    }
    Ok(settings)
}

/// Runs the pipeline on a fresh runtime. Ctrl-C cancels the run.
pub(crate) fn execute(settings: &BuildSettings, jobs: usize) -> Result<BuildOutcome> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(jobs)
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let ctx = BuildContext::new(jobs);
    let token = ctx.cancel_token().clone();

    let outcome = runtime.block_on(async {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted; finishing with partial results");
                token.cancel();
            }
        });
        run_build(settings, &ctx).await
    });
    Ok(outcome)
}

pub(crate) fn jobs(args: &RunArgs, config: &Config) -> usize {
    args.jobs.or(config.jobs).unwrap_or_else(default_jobs).max(1)
}

/// Writes the report file, prints results and sets the exit status.
///
/// With `always_report`, or after a fatal error, the report is emitted even
/// without a usable file: it goes to stdout in JSON mode and to stderr
/// otherwise.
pub(crate) fn finish(
    outcome: &BuildOutcome,
    report_path: Option<&Path>,
    format: OutputFormat,
    always_report: bool,
) -> Result<()> {
    let report = outcome.report();
    let always_report = always_report || outcome.aborted();
    let mut written = false;
    if let Some(path) = report_path {
        match report.write(path) {
            Ok(()) => written = true,
            Err(e) => eprintln!("warning: could not write report to {}: {e}", path.display()),
        }
    }

    match format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Human => {
            println!("{}", render_human(outcome));
            if always_report && !written {
                eprintln!("{}", report.to_json()?);
            }
        }
    }

    if !outcome.success() {
        bail!("{} error(s) found", outcome.log.error_count());
    }
    Ok(())
}

fn default_report_path(output: &Path) -> PathBuf {
    output.join(REPORT_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["folio", "check"];
        full.extend_from_slice(argv);
        match crate::cli::Cli::parse_from(full).command {
            crate::cli::Command::Check(args) => args.run,
            _ => unreachable!(),
        }
    }

    #[test]
    fn flags_override_config() {
        let config: Config = toml::from_str(
            "jobs = 8\nsnippet_timeout = \"9s\"\nextensions = [\"mdx\"]\nsite_title = \"Handbook\"\n",
        )
        .unwrap();
        let args = run_args(&["docs", "--jobs", "2", "--timeout", "1s", "--no-snippets"]);

        let settings = settings_from(&args, &config).unwrap();

        assert_eq!(jobs(&args, &config), 2);
        assert_eq!(settings.validate.timeout, Duration::from_secs(1));
        assert_eq!(settings.load.extensions, vec!["mdx".to_string()]);
        assert_eq!(settings.site_title, "Handbook");
        assert!(!settings.snippets);
        assert!(settings.output.is_none());
    }

    #[test]
    fn config_fills_unset_flags() {
        let config: Config =
            toml::from_str("jobs = 3\nsnippet_timeout = \"250ms\"\ncase_insensitive = true\n")
                .unwrap();
        let args = run_args(&["docs"]);

        let settings = settings_from(&args, &config).unwrap();

        assert_eq!(jobs(&args, &config), 3);
        assert_eq!(settings.validate.timeout, Duration::from_millis(250));
        assert!(settings.resolve.case_insensitive);
        assert!(settings.snippets);
    }
}
