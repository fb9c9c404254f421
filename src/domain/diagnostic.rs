//! Diagnostics emitted by the loader, resolver and snippet validator.
//!
//! A diagnostic is a (severity, kind, message, location) record. Diagnostics
//! are collected in append-only [`DiagnosticLog`]s: each worker owns one and
//! the logs are merged once a phase finishes.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where in the content tree a diagnostic applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    /// File path relative to the content root (or as given, for fatal errors).
    pub path: PathBuf,
    /// 1-based line number, when the issue is tied to a line.
    pub line: Option<usize>,
}

impl SourceLocation {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            line: None,
        }
    }

    pub fn line(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line: Some(line),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.path.display(), line),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// The kind of issue a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// File is not valid UTF-8 text.
    EncodingError,
    /// File could not be read.
    ReadError,
    /// A fenced code block or callout is never closed.
    UnterminatedBlock,
    /// Front matter is present but is not valid YAML.
    InvalidFrontMatter,
    /// A relative link points at no known document or asset.
    BrokenLink,
    /// A link fragment matches no anchor in the target document.
    BrokenAnchor,
    /// Two documents normalize to the same path.
    DuplicatePath,
    /// A snippet checker rejected a code block.
    SnippetError,
    /// A snippet checker did not finish in time.
    SnippetTimeout,
    /// The run was cancelled before every phase completed.
    Cancelled,
    /// The content root does not exist or is not a directory.
    RootNotFound,
    /// The output location cannot be written.
    OutputUnwritable,
}

impl DiagnosticKind {
    /// Returns the default severity of this kind.
    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::EncodingError
            | DiagnosticKind::ReadError
            | DiagnosticKind::DuplicatePath
            | DiagnosticKind::Cancelled
            | DiagnosticKind::RootNotFound
            | DiagnosticKind::OutputUnwritable => Severity::Error,
            DiagnosticKind::UnterminatedBlock
            | DiagnosticKind::InvalidFrontMatter
            | DiagnosticKind::BrokenLink
            | DiagnosticKind::BrokenAnchor
            | DiagnosticKind::SnippetError
            | DiagnosticKind::SnippetTimeout => Severity::Warning,
        }
    }

    /// Fatal kinds abort the run and cannot be downgraded.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            DiagnosticKind::RootNotFound | DiagnosticKind::OutputUnwritable
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::EncodingError => "EncodingError",
            DiagnosticKind::ReadError => "ReadError",
            DiagnosticKind::UnterminatedBlock => "UnterminatedBlock",
            DiagnosticKind::InvalidFrontMatter => "InvalidFrontMatter",
            DiagnosticKind::BrokenLink => "BrokenLink",
            DiagnosticKind::BrokenAnchor => "BrokenAnchor",
            DiagnosticKind::DuplicatePath => "DuplicatePath",
            DiagnosticKind::SnippetError => "SnippetError",
            DiagnosticKind::SnippetTimeout => "SnippetTimeout",
            DiagnosticKind::Cancelled => "Cancelled",
            DiagnosticKind::RootNotFound => "RootNotFound",
            DiagnosticKind::OutputUnwritable => "OutputUnwritable",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, never affects the exit code.
    Warning,
    /// Makes the run fail.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single reported issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    /// Creates a diagnostic with the kind's default severity.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: kind.default_severity(),
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Attaches a source location.
    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn encoding_error(path: impl Into<PathBuf>, detail: impl fmt::Display) -> Self {
        Self::new(DiagnosticKind::EncodingError, format!("invalid encoding: {detail}"))
            .at(SourceLocation::file(path))
    }

    pub fn read_error(path: impl Into<PathBuf>, detail: impl fmt::Display) -> Self {
        Self::new(DiagnosticKind::ReadError, format!("could not read file: {detail}"))
            .at(SourceLocation::file(path))
    }

    pub fn unterminated_block(path: impl Into<PathBuf>, line: usize, what: &str) -> Self {
        Self::new(
            DiagnosticKind::UnterminatedBlock,
            format!("unterminated {what}; treated as plain text"),
        )
        .at(SourceLocation::line(path, line))
    }

    pub fn invalid_front_matter(path: impl Into<PathBuf>, detail: impl fmt::Display) -> Self {
        Self::new(
            DiagnosticKind::InvalidFrontMatter,
            format!("invalid front matter: {detail}"),
        )
        .at(SourceLocation::line(path, 1))
    }

    pub fn broken_link(path: impl Into<PathBuf>, line: usize, target: &str, reason: &str) -> Self {
        Self::new(
            DiagnosticKind::BrokenLink,
            format!("broken link to '{target}': {reason}"),
        )
        .at(SourceLocation::line(path, line))
    }

    pub fn broken_anchor(path: impl Into<PathBuf>, line: usize, target: &str, anchor: &str) -> Self {
        Self::new(
            DiagnosticKind::BrokenAnchor,
            format!("anchor '#{anchor}' not found in '{target}'"),
        )
        .at(SourceLocation::line(path, line))
    }

    pub fn duplicate_path(path: impl Into<PathBuf>, first: impl fmt::Display) -> Self {
        Self::new(
            DiagnosticKind::DuplicatePath,
            format!("duplicate of '{first}'; this file is ignored"),
        )
        .at(SourceLocation::file(path))
    }

    pub fn snippet_error(location: SourceLocation, checker: &str, message: &str) -> Self {
        Self::new(
            DiagnosticKind::SnippetError,
            format!("{checker} check failed: {message}"),
        )
        .at(location)
    }

    pub fn snippet_timeout(location: SourceLocation, checker: &str, limit: std::time::Duration) -> Self {
        Self::new(
            DiagnosticKind::SnippetTimeout,
            format!(
                "{checker} check did not finish within {}",
                humantime::format_duration(limit)
            ),
        )
        .at(location)
    }

    pub fn cancelled(phase: &str) -> Self {
        Self::new(
            DiagnosticKind::Cancelled,
            format!("run cancelled during {phase}; results are partial"),
        )
    }

    pub fn root_not_found(path: &Path, detail: &str) -> Self {
        Self::new(DiagnosticKind::RootNotFound, detail.to_string()).at(SourceLocation::file(path))
    }

    pub fn output_unwritable(path: &Path, detail: impl fmt::Display) -> Self {
        Self::new(
            DiagnosticKind::OutputUnwritable,
            format!("cannot write output: {detail}"),
        )
        .at(SourceLocation::file(path))
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(
                f,
                "{}: {} [{}] {}",
                self.severity, location, self.kind, self.message
            ),
            None => write!(f, "{}: [{}] {}", self.severity, self.kind, self.message),
        }
    }
}

/// Per-kind severity overrides from configuration.
#[derive(Debug, Clone, Default)]
pub struct SeverityPolicy {
    overrides: BTreeMap<DiagnosticKind, Severity>,
}

impl SeverityPolicy {
    pub fn new(overrides: BTreeMap<DiagnosticKind, Severity>) -> Self {
        Self { overrides }
    }

    /// Returns the effective severity for a diagnostic. Fatal kinds keep theirs.
    pub fn severity_for(&self, diagnostic: &Diagnostic) -> Severity {
        if diagnostic.kind.is_fatal() {
            return diagnostic.severity;
        }
        self.overrides
            .get(&diagnostic.kind)
            .copied()
            .unwrap_or(diagnostic.severity)
    }
}

/// Append-only diagnostic list with exact-match suppression.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
    seen: HashSet<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic unless an identical one was already recorded.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.seen.insert(diagnostic.clone()) {
            self.entries.push(diagnostic);
        }
    }

    /// Appends every diagnostic from another log or worker list.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    /// Applies configured severity overrides to every entry.
    pub fn apply_policy(&mut self, policy: &SeverityPolicy) {
        let entries = std::mem::take(&mut self.entries);
        self.seen.clear();
        for mut diagnostic in entries {
            diagnostic.severity = policy.severity_for(&diagnostic);
            self.push(diagnostic);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    /// Returns diagnostics ordered for display: errors first, then by location.
    pub fn sorted(&self) -> Vec<&Diagnostic> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| location_key(a).cmp(&location_key(b)))
                .then_with(|| a.kind.cmp(&b.kind))
        });
        sorted
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

fn location_key(diagnostic: &Diagnostic) -> (Option<&Path>, Option<usize>) {
    match &diagnostic.location {
        Some(location) => (Some(location.path.as_path()), location.line),
        None => (None, None),
    }
}

impl From<Vec<Diagnostic>> for DiagnosticLog {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        let mut log = Self::new();
        log.extend(diagnostics);
        log
    }
}
