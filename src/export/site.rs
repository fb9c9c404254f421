//! Static site generation: one HTML page per document plus shared assets.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use minijinja::{Environment, context};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{
    Diagnostic, DiagnosticKind, DocPath, Document, PageEntry, SiteNode, SiteTree, SourceLocation,
};
use crate::export::html::render_body;
use crate::export::report::REPORT_FILE;
use crate::infra::{FsError, write_atomic};
use crate::resolve::Resolution;

/// Template for every page of the site.
///
/// Rendered without auto-escaping: text values are escaped with `|e` and
/// the body is already HTML.
pub const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{{ title|e }} - {{ site_title|e }}</title>
    {% if description %}<meta name="description" content="{{ description|e }}">{% endif %}
    <link rel="stylesheet" href="{{ root_path }}style.css">
</head>
<body>
    <nav class="site-nav" aria-label="Site">
        <p class="site-title"><a href="{{ root_path }}{{ home }}">{{ site_title|e }}</a></p>
        <ul>
        {%- if nav.index %}
            <li><a href="{{ root_path }}{{ nav.index.url }}"{% if nav.index.url == url %} aria-current="page"{% endif %}>{{ nav.index.title|e }}</a></li>
        {%- endif %}
        {%- for page in nav.pages %}
            <li><a href="{{ root_path }}{{ page.url }}"{% if page.url == url %} aria-current="page"{% endif %}>{{ page.title|e }}</a></li>
        {%- endfor %}
        {%- for dir in nav.children recursive %}
            <li class="nav-dir">
                {%- if dir.index %}
                <a href="{{ root_path }}{{ dir.index.url }}"{% if dir.index.url == url %} aria-current="page"{% endif %}>{{ dir.title|e }}</a>
                {%- else %}
                <span>{{ dir.title|e }}</span>
                {%- endif %}
                {%- if dir.pages or dir.children %}
                <ul>
                {%- for page in dir.pages %}
                    <li><a href="{{ root_path }}{{ page.url }}"{% if page.url == url %} aria-current="page"{% endif %}>{{ page.title|e }}</a></li>
                {%- endfor %}
                {{- loop(dir.children) }}
                </ul>
                {%- endif %}
            </li>
        {%- endfor %}
        </ul>
    </nav>
    <article>
        <header>
            {% if breadcrumbs %}
            <nav class="breadcrumb" aria-label="Breadcrumb">
                {% for crumb in breadcrumbs %}
                {% if not loop.first %}<span aria-hidden="true">/</span>{% endif %}
                {% if crumb.url %}<a href="{{ root_path }}{{ crumb.url }}">{{ crumb.title|e }}</a>{% else %}<span>{{ crumb.title|e }}</span>{% endif %}
                {% endfor %}
            </nav>
            {% endif %}
            {% if description %}
            <p class="description">{{ description|e }}</p>
            {% endif %}
        </header>
        <main>
            {{ content }}
        </main>
        <footer>
            <nav class="pager" aria-label="Pages">
                {% if prev %}<a class="prev" rel="prev" href="{{ root_path }}{{ prev.url }}">&larr; {{ prev.title|e }}</a>{% endif %}
                {% if next %}<a class="next" rel="next" href="{{ root_path }}{{ next.url }}">{{ next.title|e }} &rarr;</a>{% endif %}
            </nav>
        </footer>
    </article>
</body>
</html>"##;

/// The site's single stylesheet.
pub const STYLESHEET: &str = r#"
body {
    font-family: system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    line-height: 1.6;
    margin: 0;
    display: flex;
    color: #333;
}
.site-nav {
    flex: 0 0 16rem;
    padding: 1.5rem 1rem;
    border-right: 1px solid #eee;
    font-size: 0.9em;
}
.site-nav ul { list-style: none; padding-left: 0.75rem; margin: 0.25rem 0; }
.site-nav > ul { padding-left: 0; }
.site-nav .nav-dir > a, .site-nav .nav-dir > span { font-weight: 600; }
.site-nav [aria-current="page"] { color: #333; font-weight: 600; }
.site-title { font-weight: 700; margin-top: 0; }
article { flex: 1; max-width: 800px; padding: 2rem; }
h1 { border-bottom: 1px solid #eee; padding-bottom: 0.5rem; }
h1, h2, h3, h4, h5, h6 { margin-top: 1.5em; margin-bottom: 0.5em; }
a { color: #0066cc; text-decoration: none; }
a:hover { text-decoration: underline; }
.breadcrumb { color: #666; font-size: 0.9em; }
.breadcrumb span[aria-hidden] { margin: 0 0.25rem; }
.description { color: #666; }
pre {
    background: #f5f5f5;
    padding: 1rem;
    overflow-x: auto;
    border-radius: 4px;
}
code {
    font-family: 'SF Mono', Monaco, 'Cascadia Code', monospace;
    font-size: 0.9em;
}
:not(pre) > code {
    background: #f0f0f0;
    padding: 0.1rem 0.3rem;
    border-radius: 3px;
}
blockquote {
    border-left: 3px solid #ddd;
    margin-left: 0;
    padding-left: 1rem;
    color: #666;
}
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ddd; padding: 0.5rem; text-align: left; }
th { background: #f5f5f5; }
img { max-width: 100%; height: auto; }
.hint {
    border-left: 4px solid #0066cc;
    background: #f0f6ff;
    padding: 0.5rem 1rem;
    margin: 1rem 0;
    border-radius: 0 4px 4px 0;
}
.hint-warning, .hint-caution { border-color: #d29922; background: #fff8e6; }
.hint-danger, .hint-important { border-color: #cf222e; background: #ffeef0; }
.hint-success, .hint-tip { border-color: #1a7f37; background: #eefbf1; }
.pager { display: flex; justify-content: space-between; margin-top: 3rem; padding-top: 1rem; border-top: 1px solid #eee; }
.pager .next { margin-left: auto; }
"#;

/// Errors that stop site generation.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error(transparent)]
    Write(#[from] FsError),

    #[error("failed to render page: {0}")]
    Template(#[from] minijinja::Error),
}

/// Configuration for site generation.
pub struct SiteConfig<'a> {
    /// Shown in every page title and at the top of the navigation.
    pub site_title: &'a str,
}

impl Default for SiteConfig<'_> {
    fn default() -> Self {
        Self {
            site_title: "Documentation",
        }
    }
}

/// Shared stylesheet written at the top of the output.
pub const STYLESHEET_FILE: &str = "style.css";

/// Result of site generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteResult {
    pub pages_written: usize,
    pub assets_copied: usize,
    /// Assets that could not be read or would overwrite generated files.
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Serialize)]
struct Crumb<'a> {
    title: &'a str,
    url: Option<&'a str>,
}

/// Writes the site for a resolved content tree into `output_dir`.
///
/// Pages mirror the source layout, so relative links to assets keep
/// working once the assets are copied alongside them. An asset whose output
/// path belongs to a page, the stylesheet or the report is not copied and
/// is reported as a duplicate; an unreadable asset is reported and skipped.
///
/// # Errors
///
/// Returns `SiteError` when a page, the stylesheet or an asset cannot be
/// written.
pub fn generate_site(
    resolution: &Resolution,
    assets: &BTreeSet<DocPath>,
    source_root: &Path,
    output_dir: &Path,
    config: &SiteConfig,
) -> Result<SiteResult, SiteError> {
    let mut env = Environment::new();
    env.add_template("page", PAGE_TEMPLATE)?;
    let tmpl = env.get_template("page")?;

    write_atomic(&output_dir.join(STYLESHEET_FILE), STYLESHEET.as_bytes())?;

    let tree = &resolution.tree;
    let order = tree.pages();
    let home = tree
        .root()
        .index
        .as_ref()
        .or(order.first().copied())
        .map_or("index.html", |page| page.url.as_str());

    let mut result = SiteResult::default();
    for doc in &resolution.documents {
        let Some(url) = tree.url_for(doc.path()) else {
            continue;
        };
        let position = order.iter().position(|page| page.url == url);
        let prev = position.and_then(|i| i.checked_sub(1)).map(|i| order[i]);
        let next = position.and_then(|i| order.get(i + 1)).copied();

        let html = tmpl.render(context! {
            site_title => config.site_title,
            title => doc.title(),
            description => doc.description(),
            content => render_body(doc, tree, &resolution.links),
            url => url,
            home => home,
            root_path => "../".repeat(url.matches('/').count()),
            nav => tree.root(),
            breadcrumbs => breadcrumbs(tree, doc, url),
            prev => prev,
            next => next,
        })?;
        write_atomic(&output_dir.join(url), html.as_bytes())?;
        debug!(path = %doc.path(), url, "wrote page");
        result.pages_written += 1;
    }

    let mut reserved: HashSet<&str> = order.iter().map(|page| page.url.as_str()).collect();
    reserved.insert(STYLESHEET_FILE);
    reserved.insert(REPORT_FILE);
    for asset in assets {
        if reserved.contains(asset.as_str()) {
            warn!(asset = %asset, "asset collides with generated output");
            result.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::DuplicatePath,
                    format!("{asset} collides with a generated file; not copied"),
                )
                .at(SourceLocation::file(asset.as_str())),
            );
            continue;
        }
        match copy_asset(source_root, output_dir, asset)? {
            Some(diagnostic) => result.diagnostics.push(diagnostic),
            None => result.assets_copied += 1,
        }
    }

    info!(
        pages = result.pages_written,
        assets = result.assets_copied,
        output = %output_dir.display(),
        "generated site"
    );
    Ok(result)
}

/// Directories from the root down to the page, excluding the page itself.
fn breadcrumbs<'a>(tree: &'a SiteTree, doc: &Document, url: &str) -> Vec<Crumb<'a>> {
    let mut crumbs = Vec::new();
    let mut node = tree.root();
    push_crumb(&mut crumbs, node, "Home", url);
    for segment in doc.path().dir_segments() {
        let Some(child) = node.children.iter().find(|c| c.name == segment) else {
            break;
        };
        node = child;
        push_crumb(&mut crumbs, node, &node.title, url);
    }
    crumbs
}

fn push_crumb<'a>(crumbs: &mut Vec<Crumb<'a>>, node: &'a SiteNode, title: &'a str, url: &str) {
    let index = node.index.as_ref().map(|page: &PageEntry| page.url.as_str());
    if index == Some(url) {
        return;
    }
    crumbs.push(Crumb { title, url: index });
}

/// Copies one asset. A source that cannot be read yields a diagnostic.
fn copy_asset(
    source_root: &Path,
    output_dir: &Path,
    asset: &DocPath,
) -> Result<Option<Diagnostic>, SiteError> {
    let bytes = match std::fs::read(source_root.join(asset.as_str())) {
        Ok(bytes) => bytes,
        Err(e) => return Ok(Some(Diagnostic::read_error(asset.as_str(), e))),
    };
    write_atomic(&output_dir.join(asset.as_str()), &bytes)?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_document;
    use crate::resolve::{ResolveOptions, resolve};
    use std::fs;
    use tempfile::TempDir;

    fn doc(path: &str, text: &str) -> Document {
        parse_document(DocPath::from_relative(Path::new(path)).unwrap(), text, false).document
    }

    fn site(docs: Vec<Document>) -> (TempDir, SiteResult) {
        let out = TempDir::new().unwrap();
        let resolution = resolve(docs, &BTreeSet::new(), &ResolveOptions::default());
        let result = generate_site(
            &resolution,
            &BTreeSet::new(),
            out.path(),
            out.path(),
            &SiteConfig::default(),
        )
        .unwrap();
        (out, result)
    }

    fn read(dir: &TempDir, path: &str) -> String {
        fs::read_to_string(dir.path().join(path)).unwrap()
    }

    #[test]
    fn test_generate_site_creates_files() {
        let (out, result) = site(vec![
            doc("README.md", "# Home\n"),
            doc("guide/README.md", "# Guide\n"),
            doc("guide/setup.md", "# Setup\n"),
        ]);

        assert_eq!(result.pages_written, 3);
        assert!(out.path().join("index.html").exists());
        assert!(out.path().join("style.css").exists());
        assert!(out.path().join("guide/index.html").exists());
        assert!(out.path().join("guide/setup.html").exists());
    }

    #[test]
    fn pages_link_to_shared_stylesheet_and_nav() {
        let (out, _) = site(vec![
            doc("README.md", "# Home\n"),
            doc("guide/README.md", "# Guide\n"),
            doc("guide/setup.md", "# Setup\n"),
        ]);

        let page = read(&out, "guide/setup.html");
        assert!(page.contains(r#"href="../style.css""#));
        assert!(page.contains(r#"href="../index.html""#));
        assert!(page.contains(r#"<a href="../guide/setup.html" aria-current="page">Setup</a>"#));
        assert!(page.contains("<title>Setup - Documentation</title>"));
    }

    #[test]
    fn prev_and_next_follow_tree_order() {
        let (out, _) = site(vec![
            doc("README.md", "# Home\n"),
            doc("a.md", "# Alpha\n"),
            doc("guide/README.md", "# Guide\n"),
        ]);

        let page = read(&out, "a.html");
        assert!(page.contains(r#"rel="prev" href="index.html">&larr; Home"#));
        assert!(page.contains(r#"rel="next" href="guide/index.html">Guide &rarr;"#));

        let first = read(&out, "index.html");
        assert!(!first.contains(r#"rel="prev""#));
    }

    #[test]
    fn breadcrumbs_lead_to_the_page() {
        let (out, _) = site(vec![
            doc("README.md", "# Home\n"),
            doc("guide/README.md", "# Guide\n"),
            doc("guide/setup.md", "# Setup\n"),
        ]);

        let page = read(&out, "guide/setup.html");
        assert!(page.contains(r#"<a href="../index.html">Home</a>"#));
        assert!(page.contains(r#"<a href="../guide/index.html">Guide</a>"#));

        let landing = read(&out, "index.html");
        assert!(!landing.contains("breadcrumb"));
    }

    #[test]
    fn titles_are_escaped_and_body_is_not() {
        let (out, _) = site(vec![doc("a.md", "---\ntitle: Q & A\n---\nSome *text*.\n")]);

        let page = read(&out, "a.html");
        assert!(page.contains("<title>Q &amp; A - Documentation</title>"));
        assert!(page.contains("<em>text</em>"));
    }

    #[test]
    fn assets_are_copied() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("img")).unwrap();
        fs::write(src.path().join("img/logo.png"), b"png").unwrap();
        let assets: BTreeSet<_> = [DocPath::from_relative(Path::new("img/logo.png")).unwrap()]
            .into_iter()
            .collect();
        let resolution = resolve(
            vec![doc("a.md", "![logo](img/logo.png)\n")],
            &assets,
            &ResolveOptions::default(),
        );

        let result = generate_site(
            &resolution,
            &assets,
            src.path(),
            out.path(),
            &SiteConfig::default(),
        )
        .unwrap();

        assert_eq!(result.assets_copied, 1);
        assert!(result.diagnostics.is_empty());
        assert_eq!(fs::read(out.path().join("img/logo.png")).unwrap(), b"png");
        assert!(read(&out, "a.html").contains(r#"src="img/logo.png""#));
    }

    fn asset_set(paths: &[&str]) -> BTreeSet<DocPath> {
        paths
            .iter()
            .map(|p| DocPath::from_relative(Path::new(p)).unwrap())
            .collect()
    }

    #[test]
    fn assets_never_replace_generated_files() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(src.path().join("intro.html"), "STALE").unwrap();
        fs::write(src.path().join("style.css"), "/* mine */").unwrap();
        fs::write(src.path().join("diagnostics.json"), "{}").unwrap();
        fs::write(src.path().join("notes.txt"), "kept").unwrap();
        let assets = asset_set(&["diagnostics.json", "intro.html", "notes.txt", "style.css"]);
        let resolution = resolve(
            vec![doc("intro.md", "Real page.\n")],
            &assets,
            &ResolveOptions::default(),
        );

        let result = generate_site(
            &resolution,
            &assets,
            src.path(),
            out.path(),
            &SiteConfig::default(),
        )
        .unwrap();

        assert_eq!(result.assets_copied, 1);
        let flagged: Vec<_> = result
            .diagnostics
            .iter()
            .map(|d| (d.kind, d.location.as_ref().unwrap().path.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(
            flagged,
            vec![
                (DiagnosticKind::DuplicatePath, "diagnostics.json".to_string()),
                (DiagnosticKind::DuplicatePath, "intro.html".to_string()),
                (DiagnosticKind::DuplicatePath, "style.css".to_string()),
            ]
        );
        assert!(read(&out, "intro.html").contains("Real page."));
        assert_eq!(read(&out, "style.css"), STYLESHEET);
        assert!(!out.path().join("diagnostics.json").exists());
        assert_eq!(read(&out, "notes.txt"), "kept");
    }

    #[test]
    fn unreadable_asset_is_reported_and_the_rest_copied() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(src.path().join("b.png"), b"png").unwrap();
        let assets = asset_set(&["a.png", "b.png"]);
        let resolution = resolve(vec![doc("x.md", "# X\n")], &assets, &ResolveOptions::default());

        let result = generate_site(
            &resolution,
            &assets,
            src.path(),
            out.path(),
            &SiteConfig::default(),
        )
        .unwrap();

        assert_eq!(result.pages_written, 1);
        assert_eq!(result.assets_copied, 1);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::ReadError);
        assert!(out.path().join("b.png").exists());
    }
}
