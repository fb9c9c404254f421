//! Markdown to HTML conversion.

use std::collections::HashMap;
use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, Parser, Tag, html};
use regex::Regex;

use crate::domain::{Block, DocPath, Document, SiteTree, relative_url};
use crate::loader::markdown_options;
use crate::resolve::LinkMap;

/// GitBook `{% content-ref %}` / `{% endcontent-ref %}` marker lines.
static CONTENT_REF_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\{%\s*(?:end)?content-ref\b[^%]*%\}[ \t]*\r?\n?").expect("valid regex")
});

/// Renders a document's body for the site.
///
/// Headings get the slugs from the document's anchor set, and internal
/// links that resolved to a page are rewritten to that page's output URL.
pub fn render_body(doc: &Document, tree: &SiteTree, links: &LinkMap) -> String {
    let (markdown, slugs) = render_source(doc);
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(markdown.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let page_url = tree.url_for(doc.path()).unwrap_or_default();

    let events = Parser::new_ext(&markdown, markdown_options())
        .into_offset_iter()
        .map(|(event, range)| match event {
            Event::Start(Tag::Heading(level, id, classes)) => {
                let line = line_starts.partition_point(|&start| start <= range.start) - 1;
                let id = id.or_else(|| slugs.get(&line).map(String::as_str));
                Event::Start(Tag::Heading(level, id, classes))
            }
            Event::Start(Tag::Link(kind, dest, title)) => {
                let dest = rewrite_link(dest, doc.path(), page_url, tree, links);
                Event::Start(Tag::Link(kind, dest, title))
            }
            Event::Start(Tag::Image(kind, dest, title)) => {
                let dest = rewrite_link(dest, doc.path(), page_url, tree, links);
                Event::Start(Tag::Image(kind, dest, title))
            }
            other => other,
        });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

/// Builds the Markdown handed to the renderer.
///
/// Front matter is dropped, callouts become `<div>`s whose bodies still
/// render as Markdown and content-ref markers are removed. Returns the text
/// and the slug of each heading keyed by its 0-based line in that text.
fn render_source(doc: &Document) -> (String, HashMap<usize, String>) {
    let mut out = String::new();
    let mut slugs = HashMap::new();
    let mut line = 0;

    for block in doc.blocks() {
        let text = match block {
            Block::Heading(heading) => {
                slugs.insert(line, heading.slug.clone());
                heading.raw.clone()
            }
            Block::Callout(callout) => format!(
                "<div class=\"hint hint-{}\">\n\n{}\n\n</div>\n",
                callout.style,
                callout.body().trim_end()
            ),
            Block::Paragraph(text) => CONTENT_REF_MARKER.replace_all(&text.raw, "").into_owned(),
            other => other.raw(),
        };
        line += text.matches('\n').count();
        out.push_str(&text);
    }
    (out, slugs)
}

fn rewrite_link<'a>(
    dest: CowStr<'a>,
    source: &DocPath,
    page_url: &str,
    tree: &SiteTree,
    links: &LinkMap,
) -> CowStr<'a> {
    if dest.starts_with('#') {
        return dest;
    }
    let Some(target_url) = links
        .get(&(source.clone(), dest.to_string()))
        .and_then(|target| tree.url_for(target))
    else {
        return dest;
    };

    let mut url = relative_url(page_url, target_url);
    if let Some((_, anchor)) = dest.split_once('#') {
        url.push('#');
        url.push_str(anchor);
    }
    CowStr::from(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_document;
    use crate::resolve::{ResolveOptions, resolve};
    use std::collections::BTreeSet;
    use std::path::Path;

    fn doc(path: &str, text: &str) -> Document {
        parse_document(DocPath::from_relative(Path::new(path)).unwrap(), text, false).document
    }

    fn render(docs: Vec<Document>, page: &str) -> String {
        let resolution = resolve(docs, &BTreeSet::new(), &ResolveOptions::default());
        let doc = resolution
            .documents
            .iter()
            .find(|d| d.path().as_str() == page)
            .unwrap();
        render_body(doc, &resolution.tree, &resolution.links)
    }

    fn render_one(text: &str) -> String {
        render(vec![doc("a.md", text)], "a.md")
    }

    #[test]
    fn renders_basic_markdown() {
        let html = render_one("# Hello\n\nWorld");
        assert!(html.contains(r#"<h1 id="hello">Hello</h1>"#));
        assert!(html.contains("<p>World</p>"));
    }

    #[test]
    fn renders_tables() {
        let html = render_one("| A | B |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn escapes_less_than_in_text() {
        let html = render_one("Use `Span<T>` and a < b\n");
        assert!(html.contains("<code>Span&lt;T&gt;</code>"));
        assert!(html.contains("a &lt; b"));
    }

    #[test]
    fn renders_task_lists() {
        let html = render_one("- [x] done\n- [ ] todo\n");
        assert!(html.contains("checkbox"));
    }

    #[test]
    fn headings_use_document_slugs() {
        let html = render(
            vec![doc("a.md", "# Intro\n\n## Setup\n\n## Setup\n\n## Custom {#my-id}\n")],
            "a.md",
        );
        assert!(html.contains(r#"<h1 id="intro">Intro</h1>"#));
        assert!(html.contains(r#"<h2 id="setup">Setup</h2>"#));
        assert!(html.contains(r#"<h2 id="setup-1">Setup</h2>"#));
        assert!(html.contains(r#"<h2 id="my-id">Custom</h2>"#));
    }

    #[test]
    fn heading_ids_survive_front_matter_and_code() {
        let html = render(
            vec![doc(
                "a.md",
                "---\ntitle: A\n---\n```sh\n# not a heading\n```\n\n# Real\n",
            )],
            "a.md",
        );
        assert!(html.contains(r#"<h1 id="real">Real</h1>"#));
        assert!(!html.contains("title: A"));
        assert!(html.contains("# not a heading"));
    }

    #[test]
    fn internal_links_point_at_output_pages() {
        let html = render(
            vec![
                doc("guide/README.md", "# Guide\n\nSee [setup](setup.md#install) and [home](../README.md).\n"),
                doc("guide/setup.md", "# Setup\n\n## Install\n"),
                doc("README.md", "# Home\n"),
            ],
            "guide/README.md",
        );
        assert!(html.contains(r#"href="../guide/setup.html#install""#));
        assert!(html.contains(r#"href="../index.html""#));
    }

    #[test]
    fn external_and_fragment_links_are_untouched() {
        let html = render(
            vec![doc(
                "a.md",
                "# A\n\n[out](https://example.com/x.md) [here](#a) [gone](missing.md)\n",
            )],
            "a.md",
        );
        assert!(html.contains(r#"href="https://example.com/x.md""#));
        assert!(html.contains(r##"href="#a""##));
        assert!(html.contains(r#"href="missing.md""#));
    }

    #[test]
    fn callouts_render_as_hint_divs() {
        let html = render(
            vec![doc(
                "a.md",
                "{% hint style=\"warning\" %}\nMind the **gap**.\n{% endhint %}\n\n> [!NOTE]\n> Noted.\n",
            )],
            "a.md",
        );
        assert!(html.contains(r#"<div class="hint hint-warning">"#));
        assert!(html.contains("<strong>gap</strong>"));
        assert!(html.contains(r#"<div class="hint hint-note">"#));
        assert!(!html.contains("endhint"));
    }

    #[test]
    fn content_ref_markers_are_dropped() {
        let html = render(
            vec![
                doc(
                    "a.md",
                    "{% content-ref url=\"b.md\" %}\n[b.md](b.md)\n{% endcontent-ref %}\n",
                ),
                doc("b.md", "# B\n"),
            ],
            "a.md",
        );
        assert!(!html.contains("content-ref"));
        assert!(html.contains(r#"href="b.html""#));
    }
}
