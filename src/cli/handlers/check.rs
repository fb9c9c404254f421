//! Check command handler.

use anyhow::Result;

use super::{execute, finish, jobs, settings_from};
use crate::cli::CheckArgs;
use crate::cli::config::Config;

pub fn handle_check(args: &CheckArgs, config: &Config) -> Result<()> {
    let settings = settings_from(&args.run, config)?;
    let outcome = execute(&settings, jobs(&args.run, config))?;
    finish(&outcome, args.run.report.as_deref(), args.run.format, false)
}
