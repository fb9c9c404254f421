//! The machine-readable diagnostics report.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{Diagnostic, DiagnosticKind, DiagnosticLog, Severity};
use crate::infra::{FsError, write_atomic};
use crate::resolve::LinkStats;
use crate::validate::SnippetSummary;

/// File name of the report inside the site output.
pub const REPORT_FILE: &str = "diagnostics.json";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Write(#[from] FsError),
}

/// One diagnostic as it appears in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub message: String,
}

impl From<&Diagnostic> for DiagnosticRecord {
    fn from(diagnostic: &Diagnostic) -> Self {
        let location = diagnostic.location.as_ref();
        Self {
            severity: diagnostic.severity,
            kind: diagnostic.kind,
            file: location.map(|l| l.path.to_string_lossy().replace('\\', "/")),
            line: location.and_then(|l| l.line),
            message: diagnostic.message.clone(),
        }
    }
}

/// Summary of a run plus every diagnostic, errors first.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub root: String,
    pub documents: usize,
    pub links: LinkStats,
    pub snippets: SnippetSummary,
    pub errors: usize,
    pub warnings: usize,
    pub diagnostics: Vec<DiagnosticRecord>,
}

impl Report {
    pub fn new(
        root: &Path,
        documents: usize,
        links: LinkStats,
        snippets: SnippetSummary,
        log: &DiagnosticLog,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            root: root.display().to_string(),
            documents,
            links,
            snippets,
            errors: log.error_count(),
            warnings: log.warning_count(),
            diagnostics: log.sorted().into_iter().map(DiagnosticRecord::from).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the report atomically, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        let mut json = self.to_json()?;
        json.push('\n');
        write_atomic(path, json.as_bytes())?;
        Ok(())
    }
}
