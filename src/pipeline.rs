//! The build pipeline: load, resolve, validate, then write the site.
//!
//! Each phase finishes before the next starts. Fatal conditions end the run
//! with a single diagnostic; everything else is collected and reported.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::context::BuildContext;
use crate::domain::{Diagnostic, DiagnosticKind, DiagnosticLog, SeverityPolicy};
use crate::export::{Report, SiteConfig, SiteError, SiteResult, generate_site};
use crate::infra::FsError;
use crate::loader::{LoadOptions, load_documents};
use crate::resolve::{LinkStats, ResolveOptions, resolve};
use crate::validate::{CheckerRegistry, SnippetSummary, ValidateOptions, validate_snippets};

/// Everything a run needs, after config and flags are merged.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub root: PathBuf,
    /// Where to write the site; `None` checks without writing pages.
    pub output: Option<PathBuf>,
    pub site_title: String,
    pub load: LoadOptions,
    pub resolve: ResolveOptions,
    pub validate: ValidateOptions,
    pub checkers: CheckerRegistry,
    /// Run the snippet validator.
    pub snippets: bool,
    pub severity: SeverityPolicy,
}

impl BuildSettings {
    /// Defaults for a check-only run over `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output: None,
            site_title: "Documentation".to_string(),
            load: LoadOptions::default(),
            resolve: ResolveOptions::default(),
            validate: ValidateOptions::default(),
            checkers: CheckerRegistry::with_builtins(),
            snippets: true,
            severity: SeverityPolicy::default(),
        }
    }
}

/// Conditions that abort a run.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("content root {} does not exist", path.display())]
    RootNotFound { path: PathBuf },

    #[error("content root {} is not a directory", path.display())]
    RootNotADirectory { path: PathBuf },

    #[error("failed to scan content root: {0}")]
    Scan(FsError),

    #[error("output {} is not writable: {source}", path.display())]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: SiteError,
    },
}

impl BuildError {
    /// The single top-level diagnostic reported for this error.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BuildError::RootNotFound { path } => {
                Diagnostic::root_not_found(path, "content root does not exist")
            }
            BuildError::RootNotADirectory { path } => {
                Diagnostic::root_not_found(path, "content root is not a directory")
            }
            BuildError::Scan(_) => Diagnostic::new(DiagnosticKind::ReadError, self.to_string()),
            BuildError::OutputUnwritable { path, source } => {
                Diagnostic::output_unwritable(path, source)
            }
        }
    }
}

/// What a run produced.
#[derive(Debug)]
pub struct BuildOutcome {
    pub root: PathBuf,
    pub log: DiagnosticLog,
    pub documents: usize,
    pub links: LinkStats,
    pub snippets: SnippetSummary,
    /// Present when pages were written.
    pub site: Option<SiteResult>,
    pub cancelled: bool,
}

impl BuildOutcome {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            log: DiagnosticLog::new(),
            documents: 0,
            links: LinkStats::default(),
            snippets: SnippetSummary::default(),
            site: None,
            cancelled: false,
        }
    }

    /// True when no error-severity diagnostic was recorded.
    pub fn success(&self) -> bool {
        !self.log.has_errors()
    }

    /// True when a fatal condition ended the run early.
    pub fn aborted(&self) -> bool {
        self.log.iter().any(|d| d.kind.is_fatal())
    }

    pub fn report(&self) -> Report {
        Report::new(
            &self.root,
            self.documents,
            self.links,
            self.snippets,
            &self.log,
        )
    }
}

/// Runs every phase and returns the collected outcome.
///
/// Never fails: fatal conditions are recorded as a diagnostic so the
/// report can still be written.
pub async fn run_build(settings: &BuildSettings, ctx: &BuildContext) -> BuildOutcome {
    let mut outcome = BuildOutcome::new(&settings.root);
    if let Err(e) = run_phases(settings, ctx, &mut outcome).await {
        error!(error = %e, "build aborted");
        outcome.log.push(e.to_diagnostic());
    }
    outcome.log.apply_policy(&settings.severity);
    info!(
        errors = outcome.log.error_count(),
        warnings = outcome.log.warning_count(),
        "build finished"
    );
    outcome
}

async fn run_phases(
    settings: &BuildSettings,
    ctx: &BuildContext,
    outcome: &mut BuildOutcome,
) -> Result<(), BuildError> {
    check_root(&settings.root)?;
    if let Some(output) = &settings.output {
        std::fs::create_dir_all(output).map_err(|e| BuildError::OutputUnwritable {
            path: output.clone(),
            source: SiteError::Write(FsError::Io {
                path: output.clone(),
                source: e,
            }),
        })?;
    }

    let mut load = settings.load.clone();
    if load.exclude.is_none() {
        load.exclude = settings.output.clone();
    }
    let loaded = load_documents(&settings.root, &load, ctx)
        .await
        .map_err(|e| match e {
            FsError::NotFound { path } => BuildError::RootNotFound { path },
            FsError::NotADirectory { path } => BuildError::RootNotADirectory { path },
            other => BuildError::Scan(other),
        })?;
    outcome.documents = loaded.documents.len();
    outcome.log.extend(loaded.diagnostics);
    if loaded.cancelled {
        outcome.cancelled = true;
        return Ok(());
    }

    let resolution = resolve(loaded.documents, &loaded.assets, &settings.resolve);
    outcome.documents = resolution.documents.len();
    outcome.links = resolution.stats;
    outcome.log.extend(resolution.diagnostics.iter().cloned());

    if settings.snippets {
        let validated = validate_snippets(
            &resolution.documents,
            &settings.checkers,
            &settings.validate,
            ctx,
        )
        .await;
        outcome.snippets = validated.summary;
        outcome.log.extend(validated.diagnostics);
        if validated.cancelled {
            outcome.cancelled = true;
            return Ok(());
        }
    }

    if let Some(output) = &settings.output {
        if ctx.is_cancelled() {
            warn!("cancelled before writing the site");
            outcome.cancelled = true;
            outcome.log.push(Diagnostic::cancelled("site generation"));
            return Ok(());
        }
        let config = SiteConfig {
            site_title: &settings.site_title,
        };
        let site = generate_site(
            &resolution,
            &loaded.assets,
            &settings.root,
            output,
            &config,
        )
        .map_err(|source| BuildError::OutputUnwritable {
            path: output.clone(),
            source,
        })?;
        outcome.log.extend(site.diagnostics.iter().cloned());
        outcome.site = Some(site);
    }
    Ok(())
}

fn check_root(root: &Path) -> Result<(), BuildError> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(BuildError::RootNotADirectory {
            path: root.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BuildError::RootNotFound {
            path: root.to_path_buf(),
        }),
        Err(e) => Err(BuildError::Scan(FsError::Io {
            path: root.to_path_buf(),
            source: e,
        })),
    }
}
