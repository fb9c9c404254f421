//! Build command handler.

use anyhow::Result;

use super::{default_report_path, execute, finish, jobs, settings_from};
use crate::cli::BuildArgs;
use crate::cli::config::Config;

pub fn handle_build(args: &BuildArgs, config: &Config) -> Result<()> {
    let mut settings = settings_from(&args.run, config)?;
    let output = config.output_dir(args.output.as_ref(), &args.run.root);
    if let Some(title) = &args.title {
        settings.site_title = title.clone();
    }
    settings.output = Some(output.clone());

    let outcome = execute(&settings, jobs(&args.run, config))?;

    // A fatal error can leave no output directory to put the report in.
    let report_path = args
        .run
        .report
        .clone()
        .or_else(|| output.is_dir().then(|| default_report_path(&output)));
    finish(&outcome, report_path.as_deref(), args.run.format, true)
}
