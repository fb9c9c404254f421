//! Link and anchor extraction.
//!
//! Works on the document's prose: the source with front matter and code
//! block lines blanked, so byte offsets map back to the original lines.

use std::sync::LazyLock;

use pulldown_cmark::{Event, LinkType, Parser, Tag};
use regex::Regex;

use super::markdown_options;
use crate::domain::{DocPath, LinkReference};

/// GitBook `{% content-ref url="…" %}` blocks.
static CONTENT_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{%\s*content-ref\s+url\s*=\s*"([^"]+)"\s*%\}"#).expect("valid regex")
});

static EXPLICIT_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\s[^>]*?\b(?:name|id)\s*=\s*"([^"]+)""#).expect("valid regex")
});

/// Extracts inline, reference-style, image and content-ref links in source order.
pub fn extract_links(source: &DocPath, prose: &str) -> Vec<LinkReference> {
    let line_starts = line_starts(prose);
    let mut links = Vec::new();

    for (event, range) in Parser::new_ext(prose, markdown_options()).into_offset_iter() {
        let (Event::Start(Tag::Link(kind, dest, _)) | Event::Start(Tag::Image(kind, dest, _))) =
            event
        else {
            continue;
        };
        if matches!(kind, LinkType::Email) {
            continue;
        }
        let line = line_at(&line_starts, range.start);
        links.extend(LinkReference::new(source.clone(), line, dest.to_string()));
    }

    for (index, line) in prose.lines().enumerate() {
        for caps in CONTENT_REF.captures_iter(line) {
            links.extend(LinkReference::new(source.clone(), index + 1, &caps[1]));
        }
    }

    links.sort_by_key(|link| link.line);
    links
}

/// Extracts `<a name="…">` and `<a id="…">` anchors.
pub fn extract_anchors(prose: &str) -> Vec<String> {
    EXPLICIT_ANCHOR
        .captures_iter(prose)
        .map(|caps| caps[1].to_string())
        .collect()
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

/// 1-based line containing byte `offset`.
fn line_at(starts: &[usize], offset: usize) -> usize {
    starts.partition_point(|&start| start <= offset)
}
