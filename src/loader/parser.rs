//! Line-oriented block parser.
//!
//! Every source line lands in exactly one block, so concatenating the raw
//! text of the blocks reproduces the file.

use std::sync::LazyLock;

use pulldown_cmark::{Event, Parser, Tag};
use regex::Regex;

use super::{links, markdown_options};
use crate::domain::{
    Block, Callout, CalloutSyntax, CodeBlock, Diagnostic, DocPath, Document, Heading,
    SourceLocation, TextBlock,
};
use crate::infra::{Slugger, frontmatter};

static ATX_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]|$)").expect("valid regex"));

static HINT_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\{%\s*hint\s+style\s*=\s*"([^"]*)"\s*%\}\s*$"#).expect("valid regex")
});

static HINT_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\{%\s*endhint\s*%\}\s*$").expect("valid regex"));

static ALERT_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*>\s*\[!(note|tip|important|warning|caution)\]\s*$").expect("valid regex")
});

static TABLE_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\|?\s*:?-+:?\s*(\|\s*:?-+:?\s*)*\|?\s*$").expect("valid regex")
});

/// A parsed page plus the issues found while parsing it.
#[derive(Debug)]
pub struct ParsedDocument {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses decoded file content into a [`Document`].
///
/// `bom` records whether the file started with a UTF-8 byte order mark so
/// the document round-trips exactly. Never fails: malformed constructs are
/// reported as diagnostics and kept as plain text.
pub fn parse_document(path: DocPath, text: &str, bom: bool) -> ParsedDocument {
    let mut parser = BlockParser::new(&path);
    let mut front_matter = None;
    let mut body = text;

    if let Some(raw) = frontmatter::split(text) {
        match frontmatter::parse(&raw) {
            Ok(fm) => front_matter = Some(fm),
            Err(e) => {
                parser
                    .diagnostics
                    .push(Diagnostic::invalid_front_matter(path.as_str(), e));
                parser.blocks.push(Block::Paragraph(TextBlock {
                    line: 1,
                    raw: raw.raw.to_string(),
                }));
            }
        }
        blank_out(&mut parser.prose, raw.raw);
        body = &text[raw.raw.len()..];
        parser.first_line = raw.line_count + 1;
    }

    parser.run(body);
    let BlockParser {
        blocks,
        diagnostics,
        prose,
        ..
    } = parser;

    let links = links::extract_links(&path, &prose);
    let anchors = links::extract_anchors(&prose);
    let document = Document::builder(path)
        .bom(bom)
        .front_matter(front_matter)
        .blocks(blocks)
        .links(links)
        .anchors(anchors)
        .build();

    ParsedDocument {
        document,
        diagnostics,
    }
}

/// Plain text of a heading line and its explicit `{#id}`, if any.
pub(crate) fn heading_text(line: &str) -> (String, Option<String>) {
    let mut text = String::new();
    let mut id = None;
    for event in Parser::new_ext(line, markdown_options()) {
        match event {
            Event::Start(Tag::Heading(_, explicit, _)) => id = explicit.map(str::to_string),
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            _ => {}
        }
    }
    (text.trim().to_string(), id)
}

/// An opening code fence.
struct Fence<'a> {
    marker: u8,
    len: usize,
    info: &'a str,
}

impl<'a> Fence<'a> {
    fn open(line: &'a str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = *trimmed.as_bytes().first()?;
        if marker != b'`' && marker != b'~' {
            return None;
        }
        let len = trimmed.bytes().take_while(|&b| b == marker).count();
        if len < 3 {
            return None;
        }
        let info = trimmed[len..].trim();
        if marker == b'`' && info.contains('`') {
            return None;
        }
        Some(Self { marker, len, info })
    }

    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.len() >= self.len && trimmed.bytes().all(|b| b == self.marker)
    }
}

/// Lower-cased first word of an info string.
fn language_tag(info: &str) -> Option<String> {
    info.split(|c: char| c.is_whitespace() || c == ',')
        .next()
        .map(|word| word.trim_start_matches(['{', '.']).trim_end_matches('}'))
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

fn trim_eol(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Appends one empty line per source line, keeping line numbers stable.
fn blank_out(prose: &mut String, raw: &str) {
    for line in raw.split_inclusive('\n') {
        if line.ends_with('\n') {
            prose.push('\n');
        }
    }
}

struct BlockParser<'p> {
    path: &'p DocPath,
    first_line: usize,
    slugger: Slugger,
    blocks: Vec<Block>,
    diagnostics: Vec<Diagnostic>,
    /// Source with code lines blanked, for link extraction.
    prose: String,
}

impl<'p> BlockParser<'p> {
    fn new(path: &'p DocPath) -> Self {
        Self {
            path,
            first_line: 1,
            slugger: Slugger::new(),
            blocks: Vec::new(),
            diagnostics: Vec::new(),
            prose: String::new(),
        }
    }

    fn run(&mut self, body: &str) {
        let lines: Vec<&str> = body.split_inclusive('\n').collect();
        let mut i = 0;
        while i < lines.len() {
            i = self.next_block(&lines, i);
        }
    }

    fn line_no(&self, index: usize) -> usize {
        self.first_line + index
    }

    fn next_block(&mut self, lines: &[&str], i: usize) -> usize {
        let line = trim_eol(lines[i]);
        if line.trim().is_empty() {
            return self.blank_run(lines, i);
        }
        if let Some(fence) = Fence::open(line) {
            return self.code_block(lines, i, &fence);
        }
        if let Some(caps) = ATX_HEADING.captures(line) {
            let level = caps[1].len() as u8;
            return self.heading(lines, i, level);
        }
        if let Some(caps) = HINT_OPEN.captures(line) {
            return self.hint(lines, i, caps[1].to_lowercase());
        }
        if let Some(caps) = ALERT_OPEN.captures(line) {
            return self.alert(lines, i, caps[1].to_lowercase());
        }
        if table_starts(lines, i) {
            return self.table(lines, i);
        }
        self.paragraph(lines, i)
    }

    fn push_text(&mut self, lines: &[&str], start: usize, end: usize) -> TextBlock {
        let raw = lines[start..end].concat();
        self.prose.push_str(&raw);
        TextBlock {
            line: self.line_no(start),
            raw,
        }
    }

    fn blank_run(&mut self, lines: &[&str], i: usize) -> usize {
        let mut j = i + 1;
        while j < lines.len() && trim_eol(lines[j]).trim().is_empty() {
            j += 1;
        }
        let block = self.push_text(lines, i, j);
        self.blocks.push(Block::Blank(block));
        j
    }

    fn code_block(&mut self, lines: &[&str], i: usize, fence: &Fence<'_>) -> usize {
        let close = (i + 1..lines.len()).find(|&j| fence.closes(trim_eol(lines[j])));
        let Some(j) = close else {
            self.diagnostics.push(Diagnostic::unterminated_block(
                self.path.as_str(),
                self.line_no(i),
                "code fence",
            ));
            let raw = lines[i..].concat();
            blank_out(&mut self.prose, &raw);
            self.blocks.push(Block::Paragraph(TextBlock {
                line: self.line_no(i),
                raw,
            }));
            return lines.len();
        };

        let block = CodeBlock {
            language: language_tag(fence.info),
            info: fence.info.to_string(),
            text: lines[i + 1..j].concat(),
            location: SourceLocation::line(self.path.as_str(), self.line_no(i)),
            open_fence: lines[i].to_string(),
            close_fence: lines[j].to_string(),
        };
        blank_out(&mut self.prose, &lines[i..=j].concat());
        self.blocks.push(Block::Code(block));
        j + 1
    }

    fn heading(&mut self, lines: &[&str], i: usize, level: u8) -> usize {
        let (text, id) = heading_text(trim_eol(lines[i]));
        let slug = match id {
            Some(id) => self.slugger.claim(&id),
            None => self.slugger.slug(&text),
        };
        self.prose.push_str(lines[i]);
        self.blocks.push(Block::Heading(Heading {
            level,
            text,
            slug,
            line: self.line_no(i),
            raw: lines[i].to_string(),
        }));
        i + 1
    }

    fn hint(&mut self, lines: &[&str], i: usize, style: String) -> usize {
        let close = (i + 1..lines.len()).find(|&j| HINT_CLOSE.is_match(trim_eol(lines[j])));
        let Some(j) = close else {
            self.diagnostics.push(Diagnostic::unterminated_block(
                self.path.as_str(),
                self.line_no(i),
                "hint",
            ));
            let block = self.push_text(lines, i, i + 1);
            self.blocks.push(Block::Paragraph(block));
            return i + 1;
        };

        let block = self.push_text(lines, i, j + 1);
        self.blocks.push(Block::Callout(Callout {
            syntax: CalloutSyntax::GitbookHint,
            style,
            line: block.line,
            raw: block.raw,
        }));
        j + 1
    }

    fn alert(&mut self, lines: &[&str], i: usize, style: String) -> usize {
        let mut j = i + 1;
        while j < lines.len() && lines[j].trim_start().starts_with('>') {
            j += 1;
        }
        let block = self.push_text(lines, i, j);
        self.blocks.push(Block::Callout(Callout {
            syntax: CalloutSyntax::GithubAlert,
            style,
            line: block.line,
            raw: block.raw,
        }));
        j
    }

    fn table(&mut self, lines: &[&str], i: usize) -> usize {
        let mut j = i + 2;
        while j < lines.len() && lines[j].trim_start().starts_with('|') {
            j += 1;
        }
        let block = self.push_text(lines, i, j);
        self.blocks.push(Block::Table(block));
        j
    }

    fn paragraph(&mut self, lines: &[&str], i: usize) -> usize {
        let mut j = i + 1;
        while j < lines.len() && !trim_eol(lines[j]).trim().is_empty() && !starts_block(lines, j) {
            j += 1;
        }
        let block = self.push_text(lines, i, j);
        self.blocks.push(Block::Paragraph(block));
        j
    }
}

fn table_starts(lines: &[&str], i: usize) -> bool {
    lines[i].trim_start().starts_with('|')
        && lines.get(i + 1).is_some_and(|next| {
            let next = trim_eol(next);
            next.contains('|') && TABLE_DELIMITER.is_match(next)
        })
}

/// Whether line `i` opens a block that interrupts a paragraph.
fn starts_block(lines: &[&str], i: usize) -> bool {
    let line = trim_eol(lines[i]);
    Fence::open(line).is_some()
        || ATX_HEADING.is_match(line)
        || HINT_OPEN.is_match(line)
        || ALERT_OPEN.is_match(line)
        || table_starts(lines, i)
}
