//! Configuration file support.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::domain::{DiagnosticKind, Severity, SeverityPolicy};
use crate::validate::{CheckerRegistry, CheckerSpec};

/// Name of the per-project config file looked up in the content root.
pub const PROJECT_CONFIG: &str = "folio.toml";

/// Application configuration loaded from a config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Site output directory, relative to the config file
    pub output: Option<PathBuf>,

    pub site_title: Option<String>,

    /// Parallel workers
    pub jobs: Option<usize>,

    /// Time limit per snippet check, e.g. "5s"
    pub snippet_timeout: Option<String>,

    pub case_insensitive: Option<bool>,

    /// Extensions parsed as pages
    pub extensions: Option<Vec<String>>,

    /// External checkers by language
    #[serde(default)]
    pub checkers: BTreeMap<String, CheckerSpec>,

    /// Severity overrides by diagnostic kind
    #[serde(default)]
    pub severity: BTreeMap<DiagnosticKind, Severity>,

    /// The file this config came from
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl Config {
    /// Loads configuration for a content root.
    ///
    /// Precedence order:
    /// 1. The `--config` file, which must exist
    /// 2. `ROOT/folio.toml`
    /// 3. `~/.config/folio/config.toml`
    /// 4. Defaults
    pub fn load(explicit: Option<&Path>, root: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                bail!("config file not found: {}", path.display());
            }
            return Self::from_file(path);
        }
        let project = root.join(PROJECT_CONFIG);
        if project.is_file() {
            return Self::from_file(&project);
        }
        let user = Self::config_path();
        if user.is_file() {
            return Self::from_file(&user);
        }
        Ok(Self::default())
    }

    /// Parses one config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        config.snippet_timeout()?;
        Ok(config)
    }

    /// Returns the path to the user config file.
    ///
    /// Default: `~/.config/folio/config.toml`
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio")
            .join("config.toml")
    }

    /// Resolve the site output directory, with CLI argument taking precedence.
    ///
    /// Precedence order:
    /// 1. CLI `--output` argument
    /// 2. Config file `output` setting, relative to the config file
    /// 3. `ROOT/_site`
    pub fn output_dir(&self, cli_output: Option<&PathBuf>, root: &Path) -> PathBuf {
        if let Some(output) = cli_output {
            return output.clone();
        }
        let base_dir = self.source.as_deref().and_then(Path::parent);
        match (&self.output, base_dir) {
            (Some(output), Some(base)) => base.join(output),
            (Some(output), None) => output.clone(),
            (None, _) => root.join("_site"),
        }
    }

    /// Path of the file this config was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn snippet_timeout(&self) -> Result<Option<Duration>> {
        self.snippet_timeout
            .as_deref()
            .map(|s| {
                humantime::parse_duration(s)
                    .with_context(|| format!("invalid snippet_timeout: '{s}'"))
            })
            .transpose()
    }

    /// Builtin checkers plus the configured ones.
    pub fn checker_registry(&self) -> Result<CheckerRegistry> {
        CheckerRegistry::from_specs(&self.checkers).context("invalid checker configuration")
    }

    pub fn severity_policy(&self) -> SeverityPolicy {
        SeverityPolicy::new(self.severity.clone())
    }
}
