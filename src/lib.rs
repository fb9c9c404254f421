//! folio - build a static site from a Markdown documentation tree and
//! report broken links and invalid code snippets

pub mod cli;
pub mod context;
pub mod domain;
pub mod export;
pub mod infra;
pub mod loader;
pub mod pipeline;
pub mod resolve;
pub mod validate;

use anyhow::Result;
use clap::Parser;

use cli::{
    Cli, Command,
    config::Config,
    handlers::{handle_build, handle_check, handle_completions},
};
use infra::init_logging;

/// Main entry point for the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.verbose);

    match &cli.command {
        Command::Build(args) => {
            let config = Config::load(cli.config.as_deref(), &args.run.root)?;
            handle_build(args, &config)
        }
        Command::Check(args) => {
            let config = Config::load(cli.config.as_deref(), &args.run.root)?;
            handle_check(args, &config)
        }
        Command::Completions(args) => handle_completions(args),
    }
}
