//! CLI command definitions and handlers

pub mod config;
pub mod handlers;
pub mod output;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::infra::LogFormat;
use output::OutputFormat;

/// folio - build and check a Markdown documentation tree
#[derive(Parser, Debug)]
#[command(name = "folio", version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ROOT/folio.toml, then the user config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Human)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the static site and write the diagnostics report
    Build(BuildArgs),

    /// Load, resolve and validate without writing a site
    Check(CheckArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by `build` and `check`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Content root directory
    pub root: PathBuf,

    /// Write the diagnostics report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Number of parallel workers (default: available parallelism)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Time limit per snippet check, e.g. "5s" or "500ms"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Compare paths case-insensitively
    #[arg(long)]
    pub case_insensitive: bool,

    /// Skip snippet validation
    #[arg(long)]
    pub no_snippets: bool,
}

/// Arguments for the `build` command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Site output directory (default: ROOT/_site)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Site title shown on every page
    #[arg(long)]
    pub title: Option<String>,
}

/// Arguments for the `check` command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the `completions` command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for (bash, zsh, fish)
    #[arg(value_enum)]
    pub shell: Shell,
}
