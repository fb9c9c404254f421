//! Cross-reference resolution: deduplicate paths, check every link and
//! anchor, and build the navigation tree.
//!
//! Runs single-threaded after the loader barrier.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Diagnostic, DocPath, Document, LinkReference, LinkTarget, SiteTree};

/// Resolved link targets, keyed by (source document, raw destination).
pub type LinkMap = HashMap<(DocPath, String), DocPath>;

/// Resolver settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Compare paths case-insensitively (for case-folding file systems).
    pub case_insensitive: bool,
}

/// Link counts for the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub resolved: usize,
    pub broken: usize,
    pub external: usize,
}

/// Output of the resolver.
#[derive(Debug)]
pub struct Resolution {
    pub tree: SiteTree,
    /// Accepted documents in lexicographic path order.
    pub documents: Vec<Document>,
    /// Internal links that resolved to a document.
    pub links: LinkMap,
    pub stats: LinkStats,
    pub diagnostics: Vec<Diagnostic>,
}

enum Target<'a> {
    Document(&'a Document),
    Asset,
}

struct Lookup<'a> {
    case_insensitive: bool,
    by_key: HashMap<String, &'a Document>,
    /// Landing page per directory key.
    dir_index: HashMap<String, &'a Document>,
    assets: HashSet<String>,
}

impl<'a> Lookup<'a> {
    fn new(documents: &'a [Document], assets: &BTreeSet<DocPath>, case_insensitive: bool) -> Self {
        let mut by_key = HashMap::new();
        let mut dir_index = HashMap::new();
        for doc in documents {
            by_key.insert(doc.path().key(case_insensitive), doc);
            if let Some(rank) = doc.landing_rank() {
                let slot = dir_index
                    .entry(fold(doc.path().dir(), case_insensitive))
                    .or_insert(doc);
                if slot.landing_rank().is_some_and(|current| rank < current) {
                    *slot = doc;
                }
            }
        }
        let assets = assets.iter().map(|a| a.key(case_insensitive)).collect();
        Self {
            case_insensitive,
            by_key,
            dir_index,
            assets,
        }
    }

    /// Finds a document, a directory's landing page, or an asset.
    fn find(&self, normalized: &str) -> Option<Target<'a>> {
        let key = fold(normalized, self.case_insensitive);
        if let Some(doc) = self.by_key.get(&key).copied() {
            return Some(Target::Document(doc));
        }
        if let Some(doc) = self.dir_index.get(&key).copied() {
            return Some(Target::Document(doc));
        }
        self.assets.contains(&key).then_some(Target::Asset)
    }
}

fn fold(s: &str, case_insensitive: bool) -> String {
    if case_insensitive {
        s.to_lowercase()
    } else {
        s.to_string()
    }
}

/// Resolves links across all loaded documents.
///
/// Documents are visited in lexicographic path order; when two share a
/// comparison key the first is kept and the later one is reported as a
/// duplicate and dropped.
pub fn resolve(
    mut documents: Vec<Document>,
    assets: &BTreeSet<DocPath>,
    options: &ResolveOptions,
) -> Resolution {
    documents.sort_by(|a, b| a.path().cmp(b.path()));
    let mut diagnostics = Vec::new();

    let mut first_by_key: HashMap<String, DocPath> = HashMap::new();
    let mut accepted = Vec::with_capacity(documents.len());
    for doc in documents {
        let key = doc.path().key(options.case_insensitive);
        if let Some(first) = first_by_key.get(&key) {
            debug!(path = %doc.path(), first = %first, "duplicate path");
            diagnostics.push(Diagnostic::duplicate_path(doc.path().as_str(), first));
            continue;
        }
        first_by_key.insert(key, doc.path().clone());
        accepted.push(doc);
    }

    let lookup = Lookup::new(&accepted, assets, options.case_insensitive);
    let mut links = LinkMap::new();
    let mut stats = LinkStats::default();

    for doc in &accepted {
        for link in doc.links() {
            match check_link(doc, link, &lookup) {
                Checked::External => stats.external += 1,
                Checked::Resolved(target) => {
                    stats.resolved += 1;
                    if let Some(target) = target {
                        links.insert((doc.path().clone(), link.raw.clone()), target);
                    }
                }
                Checked::BadAnchor(target, diagnostic) => {
                    stats.broken += 1;
                    links.insert((doc.path().clone(), link.raw.clone()), target);
                    diagnostics.push(diagnostic);
                }
                Checked::Broken(diagnostic) => {
                    stats.broken += 1;
                    diagnostics.push(diagnostic);
                }
            }
        }
    }

    let tree = SiteTree::build(&accepted);
    info!(
        documents = accepted.len(),
        resolved = stats.resolved,
        broken = stats.broken,
        external = stats.external,
        "resolved links"
    );

    Resolution {
        tree,
        documents: accepted,
        links,
        stats,
        diagnostics,
    }
}

enum Checked {
    External,
    /// Resolved; carries the target document unless it is an asset or the
    /// link stays on the same page.
    Resolved(Option<DocPath>),
    BadAnchor(DocPath, Diagnostic),
    Broken(Diagnostic),
}

fn check_link(doc: &Document, link: &LinkReference, lookup: &Lookup<'_>) -> Checked {
    let (path, anchor) = match &link.target {
        LinkTarget::External(_) => return Checked::External,
        LinkTarget::Internal { path, anchor } => (path, anchor),
    };
    let source = doc.path().as_str();

    let target = match path {
        None => doc,
        Some(path) => {
            let Some(normalized) = doc.path().join_link(path) else {
                return Checked::Broken(Diagnostic::broken_link(
                    source,
                    link.line,
                    &link.raw,
                    "escapes the content root",
                ));
            };
            match lookup.find(&normalized) {
                Some(Target::Document(target)) => target,
                Some(Target::Asset) => return Checked::Resolved(None),
                None => {
                    return Checked::Broken(Diagnostic::broken_link(
                        source,
                        link.line,
                        &link.raw,
                        "no such file",
                    ));
                }
            }
        }
    };

    let mapped = path.as_ref().map(|_| target.path().clone());
    match anchor {
        Some(anchor) if !target.has_anchor(anchor) => {
            let diagnostic =
                Diagnostic::broken_anchor(source, link.line, target.path().as_str(), anchor);
            match mapped {
                Some(target) => Checked::BadAnchor(target, diagnostic),
                None => Checked::Broken(diagnostic),
            }
        }
        _ => Checked::Resolved(mapped),
    }
}
