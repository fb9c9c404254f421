//! Snippet validation: best-effort checks of fenced code blocks.
//!
//! Each block is checked in isolation under a time limit. A failing,
//! timed-out or unavailable checker never stops the build.

mod checker;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::context::BuildContext;
use crate::domain::{CodeBlock, Diagnostic, Document, SourceLocation};

pub use checker::{
    CheckOutcome, CheckerError, CheckerRegistry, CheckerSpec, CommandChecker, ParseChecker,
    SnippetChecker,
};

/// Default per-snippet time limit.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Info-string words that opt a block out of checking.
const SKIP_FLAGS: [&str; 2] = ["ignore", "nocheck"];

/// What happened to one code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnippetStatus {
    Passed,
    Failed,
    TimedOut,
    /// No checker for the language, or the checker could not run.
    Unverified,
    /// Opted out with an `ignore` or `nocheck` flag.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetResult {
    pub location: SourceLocation,
    pub language: Option<String>,
    pub status: SnippetStatus,
}

/// Per-status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnippetSummary {
    pub passed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub unverified: usize,
    pub skipped: usize,
}

impl SnippetSummary {
    pub fn from_results(results: &[SnippetResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.status {
                SnippetStatus::Passed => summary.passed += 1,
                SnippetStatus::Failed => summary.failed += 1,
                SnippetStatus::TimedOut => summary.timed_out += 1,
                SnippetStatus::Unverified => summary.unverified += 1,
                SnippetStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.timed_out + self.unverified + self.skipped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Time limit for a single check.
    pub timeout: Duration,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Result of the validation phase.
#[derive(Debug, Default)]
pub struct ValidationOutput {
    /// One entry per checked block, in document and block order.
    pub results: Vec<SnippetResult>,
    pub summary: SnippetSummary,
    pub diagnostics: Vec<Diagnostic>,
    pub cancelled: bool,
}

struct CheckResult {
    index: usize,
    result: SnippetResult,
    diagnostic: Option<Diagnostic>,
}

/// Validates every code block of every document.
///
/// Blocks without a checker are marked unverified without scheduling any
/// work. The rest run concurrently, at most `ctx.jobs()` at a time.
pub async fn validate_snippets(
    documents: &[Document],
    registry: &CheckerRegistry,
    options: &ValidateOptions,
    ctx: &BuildContext,
) -> ValidationOutput {
    let mut output = ValidationOutput::default();
    let semaphore = Arc::new(Semaphore::new(ctx.jobs()));
    let mut tasks = JoinSet::new();
    let mut immediate = Vec::new();

    let blocks = documents.iter().flat_map(Document::code_blocks).enumerate();
    for (index, block) in blocks {
        if ctx.is_cancelled() {
            break;
        }
        let Some(checker) = plan(block, registry, &mut immediate, index) else {
            continue;
        };

        let permit = tokio::select! {
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            () = ctx.cancel_token().cancelled() => break,
        };
        let source = block.text.clone();
        let location = block.location.clone();
        let language = block.language.clone();
        let limit = options.timeout;
        tasks.spawn(async move {
            let _permit = permit;
            run_check(index, checker, source, location, language, limit).await
        });
    }

    let mut checked = immediate;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => checked.push(result),
            Err(e) => error!(error = %e, "snippet task failed"),
        }
    }
    checked.sort_by_key(|c| c.index);
    for c in checked {
        output.diagnostics.extend(c.diagnostic);
        output.results.push(c.result);
    }
    output.summary = SnippetSummary::from_results(&output.results);

    if ctx.is_cancelled() {
        output.cancelled = true;
        output
            .diagnostics
            .push(Diagnostic::cancelled("snippet validation"));
    }
    info!(
        passed = output.summary.passed,
        failed = output.summary.failed,
        timed_out = output.summary.timed_out,
        unverified = output.summary.unverified,
        skipped = output.summary.skipped,
        "validated snippets"
    );
    output
}

/// Returns the checker to run, or records a result that needs no work.
fn plan(
    block: &CodeBlock,
    registry: &CheckerRegistry,
    immediate: &mut Vec<CheckResult>,
    index: usize,
) -> Option<Arc<dyn SnippetChecker>> {
    let status = if SKIP_FLAGS.iter().any(|flag| block.has_flag(flag)) {
        SnippetStatus::Skipped
    } else if let Some(checker) = block.language.as_deref().and_then(|l| registry.lookup(l)) {
        return Some(checker);
    } else {
        SnippetStatus::Unverified
    };

    debug!(location = %block.location, ?status, "snippet not checked");
    immediate.push(CheckResult {
        index,
        result: SnippetResult {
            location: block.location.clone(),
            language: block.language.clone(),
            status,
        },
        diagnostic: None,
    });
    None
}

async fn run_check(
    index: usize,
    checker: Arc<dyn SnippetChecker>,
    source: String,
    location: SourceLocation,
    language: Option<String>,
    limit: Duration,
) -> CheckResult {
    let (status, diagnostic) = match tokio::time::timeout(limit, checker.check(&source)).await {
        Ok(CheckOutcome::Passed) => (SnippetStatus::Passed, None),
        Ok(CheckOutcome::Failed(message)) => (
            SnippetStatus::Failed,
            Some(Diagnostic::snippet_error(
                location.clone(),
                checker.name(),
                &message,
            )),
        ),
        Ok(CheckOutcome::Unavailable(reason)) => {
            warn!(checker = checker.name(), %location, %reason, "checker unavailable");
            (SnippetStatus::Unverified, None)
        }
        Err(_) => (
            SnippetStatus::TimedOut,
            Some(Diagnostic::snippet_timeout(
                location.clone(),
                checker.name(),
                limit,
            )),
        ),
    };
    debug!(%location, checker = checker.name(), ?status, "snippet checked");

    CheckResult {
        index,
        result: SnippetResult {
            location,
            language,
            status,
        },
        diagnostic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DiagnosticKind, DocPath};
    use crate::loader::parse_document;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn doc(path: &str, text: &str) -> Document {
        parse_document(DocPath::from_relative(Path::new(path)).unwrap(), text, false).document
    }

    fn statuses(output: &ValidationOutput) -> Vec<SnippetStatus> {
        output.results.iter().map(|r| r.status).collect()
    }

    struct Sleeper;

    #[async_trait]
    impl SnippetChecker for Sleeper {
        fn name(&self) -> &str {
            "sleeper"
        }

        async fn check(&self, _source: &str) -> CheckOutcome {
            tokio::time::sleep(Duration::from_secs(30)).await;
            CheckOutcome::Passed
        }
    }

    #[tokio::test]
    async fn checks_builtin_languages_in_order() {
        let docs = vec![
            doc("a.md", "```json\n{\"ok\": true}\n```\n\n```yaml\na: [1\n```\n"),
            doc("b.md", "```toml\nx = 1\n```\n"),
        ];

        let output = validate_snippets(
            &docs,
            &CheckerRegistry::with_builtins(),
            &ValidateOptions::default(),
            &BuildContext::new(4),
        )
        .await;

        assert_eq!(
            statuses(&output),
            vec![SnippetStatus::Passed, SnippetStatus::Failed, SnippetStatus::Passed]
        );
        assert_eq!(output.diagnostics.len(), 1);
        let diag = &output.diagnostics[0];
        assert_eq!(diag.kind, DiagnosticKind::SnippetError);
        assert_eq!(diag.location.as_ref().unwrap().to_string(), "a.md:5");
        assert!(diag.message.starts_with("yaml check failed"));
    }

    #[tokio::test]
    async fn unknown_language_is_unverified_without_diagnostics() {
        let docs = vec![doc("a.md", "```csharp\nvar x = 1;\n```\n\n```\nplain\n```\n")];

        let output = validate_snippets(
            &docs,
            &CheckerRegistry::with_builtins(),
            &ValidateOptions::default(),
            &BuildContext::new(1),
        )
        .await;

        assert_eq!(
            statuses(&output),
            vec![SnippetStatus::Unverified, SnippetStatus::Unverified]
        );
        assert!(output.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn skip_flags_opt_out() {
        let docs = vec![doc("a.md", "```json ignore\n{broken\n```\n```json,nocheck\n{\n```\n")];

        let output = validate_snippets(
            &docs,
            &CheckerRegistry::with_builtins(),
            &ValidateOptions::default(),
            &BuildContext::new(1),
        )
        .await;

        assert_eq!(output.summary.skipped, 2);
        assert!(output.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn slow_checks_time_out() {
        let mut registry = CheckerRegistry::empty();
        registry.register("slow", Arc::new(Sleeper));
        let docs = vec![doc("a.md", "```slow\nzzz\n```\n")];

        let output = validate_snippets(
            &docs,
            &registry,
            &ValidateOptions {
                timeout: Duration::from_millis(50),
            },
            &BuildContext::new(1),
        )
        .await;

        assert_eq!(statuses(&output), vec![SnippetStatus::TimedOut]);
        assert_eq!(output.diagnostics[0].kind, DiagnosticKind::SnippetTimeout);
        assert_eq!(output.summary.timed_out, 1);
    }

    #[tokio::test]
    async fn unavailable_command_is_unverified() {
        let mut registry = CheckerRegistry::empty();
        registry.register(
            "go",
            Arc::new(
                CommandChecker::new("go", vec!["folio-test-missing-go".to_string()], "go").unwrap(),
            ),
        );
        let docs = vec![doc("a.md", "```go\npackage main\n```\n")];

        let output = validate_snippets(
            &docs,
            &registry,
            &ValidateOptions::default(),
            &BuildContext::new(1),
        )
        .await;

        assert_eq!(statuses(&output), vec![SnippetStatus::Unverified]);
        assert!(output.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_scheduling() {
        let docs = vec![doc("a.md", "```json\n{}\n```\n")];
        let ctx = BuildContext::new(1);
        ctx.cancel();

        let output = validate_snippets(
            &docs,
            &CheckerRegistry::with_builtins(),
            &ValidateOptions::default(),
            &ctx,
        )
        .await;

        assert!(output.results.is_empty());
        assert!(output.cancelled);
        assert_eq!(output.diagnostics[0].kind, DiagnosticKind::Cancelled);
    }

    #[test]
    fn summary_counts() {
        let result = |status| SnippetResult {
            location: SourceLocation::line("a.md", 1),
            language: None,
            status,
        };
        let summary = SnippetSummary::from_results(&[
            result(SnippetStatus::Passed),
            result(SnippetStatus::Skipped),
            result(SnippetStatus::Skipped),
        ]);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.total(), 3);
    }
}
