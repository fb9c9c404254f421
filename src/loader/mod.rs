//! Content loading: discover files under the root and parse each page.

mod links;
mod parser;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pulldown_cmark::Options;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::context::BuildContext;
use crate::domain::{Diagnostic, DiagnosticKind, DocPath, Document};
use crate::infra::{FsError, has_extension, read_text, scan_content_directory};

pub use links::{extract_anchors, extract_links};
pub(crate) use parser::heading_text;
pub use parser::{ParsedDocument, parse_document};

/// Markdown extensions shared by link extraction and HTML rendering.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// What to treat as a page and what to skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// File extensions parsed as pages, without the dot.
    pub extensions: Vec<String>,
    /// Directory to leave out, typically the site output.
    pub exclude: Option<PathBuf>,
    /// Individual files to leave out, such as the loaded config file.
    pub exclude_files: Vec<PathBuf>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string(), "markdown".to_string()],
            exclude: None,
            exclude_files: Vec::new(),
        }
    }
}

/// Result of the loading phase.
#[derive(Debug, Default)]
pub struct LoadOutput {
    /// Parsed pages in lexicographic path order.
    pub documents: Vec<Document>,
    /// Non-page files that links may point at.
    pub assets: BTreeSet<DocPath>,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when the run was cancelled before every file was loaded.
    pub cancelled: bool,
}

struct FileOutcome {
    index: usize,
    document: Option<Document>,
    diagnostics: Vec<Diagnostic>,
}

/// Loads every page under `root` in parallel.
///
/// Files are read and parsed on the blocking pool, at most `ctx.jobs()` at a
/// time. Each task returns its own diagnostics; they are merged in discovery
/// order once all tasks finish. Cancellation stops scheduling new files.
///
/// # Errors
///
/// Returns `FsError` if the root cannot be scanned.
pub async fn load_documents(
    root: &Path,
    options: &LoadOptions,
    ctx: &BuildContext,
) -> Result<LoadOutput, FsError> {
    let mut output = LoadOutput::default();
    if ctx.is_cancelled() {
        output.cancelled = true;
        output.diagnostics.push(Diagnostic::cancelled("loading"));
        return Ok(output);
    }

    let scan = scan_content_directory(root, options.exclude.as_deref())?;
    for failure in scan.skipped {
        warn!(path = %failure.path.display(), error = %failure.error, "skipped unreadable entry");
        output
            .diagnostics
            .push(Diagnostic::read_error(failure.path, failure.error));
    }
    let excluded: Vec<PathBuf> = options
        .exclude_files
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .collect();

    let mut pages = Vec::new();
    for relative in scan.files {
        if !excluded.is_empty()
            && root
                .join(&relative)
                .canonicalize()
                .is_ok_and(|p| excluded.contains(&p))
        {
            continue;
        }
        let path = match DocPath::from_relative(&relative) {
            Ok(path) => path,
            Err(e) => {
                output.diagnostics.push(Diagnostic::read_error(relative, e));
                continue;
            }
        };
        if has_extension(&relative, &options.extensions) {
            pages.push(path);
        } else {
            output.assets.insert(path);
        }
    }
    debug!(pages = pages.len(), assets = output.assets.len(), "discovered content");

    let semaphore = Arc::new(Semaphore::new(ctx.jobs()));
    let mut tasks = JoinSet::new();
    for (index, path) in pages.into_iter().enumerate() {
        let permit = tokio::select! {
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            () = ctx.cancel_token().cancelled() => break,
        };
        let full_path = root.join(path.as_str());
        let cancel = ctx.cancel_token().clone();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            if cancel.is_cancelled() {
                return FileOutcome {
                    index,
                    document: None,
                    diagnostics: Vec::new(),
                };
            }
            load_file(index, path, &full_path)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!(error = %e, "loader task failed");
                output.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::ReadError,
                    format!("loader task failed: {e}"),
                ));
            }
        }
    }
    outcomes.sort_by_key(|outcome| outcome.index);
    for outcome in outcomes {
        output.diagnostics.extend(outcome.diagnostics);
        output.documents.extend(outcome.document);
    }

    if ctx.is_cancelled() {
        output.cancelled = true;
        output.diagnostics.push(Diagnostic::cancelled("loading"));
    }
    info!(
        documents = output.documents.len(),
        assets = output.assets.len(),
        "loaded content"
    );
    Ok(output)
}

fn load_file(index: usize, path: DocPath, full_path: &Path) -> FileOutcome {
    match read_text(full_path) {
        Ok(source) => {
            let parsed = parse_document(path, &source.text, source.bom);
            debug!(
                path = %parsed.document.path(),
                blocks = parsed.document.blocks().len(),
                links = parsed.document.links().len(),
                "parsed"
            );
            FileOutcome {
                index,
                document: Some(parsed.document),
                diagnostics: parsed.diagnostics,
            }
        }
        Err(FsError::InvalidEncoding { encoding, .. }) => FileOutcome {
            index,
            document: None,
            diagnostics: vec![Diagnostic::encoding_error(path.as_str(), encoding)],
        },
        Err(e) => FileOutcome {
            index,
            document: None,
            diagnostics: vec![Diagnostic::read_error(path.as_str(), e)],
        },
    }
}
