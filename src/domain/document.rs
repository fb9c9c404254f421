//! Parsed documentation pages and their content blocks.

use std::collections::BTreeSet;

use crate::domain::{DocPath, LinkReference, SourceLocation};

/// Front matter found at the top of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    /// The complete front matter text including both `---` lines.
    pub raw: String,
    /// Number of source lines the front matter spans.
    pub line_count: usize,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// An ATX heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    /// Heading text with the `#` markers removed.
    pub text: String,
    /// Anchor slug, unique within the document.
    pub slug: String,
    pub line: usize,
    pub raw: String,
}

/// A block whose content is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub line: usize,
    pub raw: String,
}

/// A fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Normalized language tag: the lower-cased first word of the info string.
    pub language: Option<String>,
    /// The info string after the opening fence, trimmed.
    pub info: String,
    /// Code between the fences.
    pub text: String,
    /// Location of the opening fence.
    pub location: SourceLocation,
    pub open_fence: String,
    pub close_fence: String,
}

impl CodeBlock {
    /// Returns true when the info string carries the given flag word.
    ///
    /// Words are separated by whitespace or commas, so both
    /// `` ```csharp ignore `` and `` ```rust,ignore `` carry `ignore`.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.info
            .split(|c: char| c.is_whitespace() || c == ',')
            .skip(1)
            .any(|word| word.eq_ignore_ascii_case(flag))
    }

    pub fn line(&self) -> usize {
        self.location.line.unwrap_or(1)
    }
}

/// The flavour of a callout block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalloutSyntax {
    /// `{% hint style="info" %}` ... `{% endhint %}`
    GitbookHint,
    /// `> [!NOTE]` followed by `>` lines.
    GithubAlert,
}

/// A hint or alert box. The payload is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callout {
    pub syntax: CalloutSyntax,
    /// `info`, `warning`, `note`, ... lower-cased.
    pub style: String,
    pub line: usize,
    pub raw: String,
}

impl Callout {
    /// Returns the Markdown inside the callout markers.
    pub fn body(&self) -> String {
        match self.syntax {
            CalloutSyntax::GitbookHint => {
                let mut lines: Vec<&str> = self.raw.split_inclusive('\n').collect();
                if !lines.is_empty() {
                    lines.remove(0);
                }
                if lines
                    .last()
                    .is_some_and(|l| l.trim().starts_with("{%") && l.contains("endhint"))
                {
                    lines.pop();
                }
                lines.concat()
            }
            CalloutSyntax::GithubAlert => self
                .raw
                .split_inclusive('\n')
                .skip(1)
                .map(|line| {
                    let stripped = line.trim_start().trim_start_matches('>');
                    stripped.strip_prefix(' ').unwrap_or(stripped)
                })
                .collect(),
        }
    }
}

/// One content block of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(Heading),
    Paragraph(TextBlock),
    Table(TextBlock),
    Code(CodeBlock),
    Callout(Callout),
    /// A run of blank lines.
    Blank(TextBlock),
}

impl Block {
    /// Returns the exact source text of the block.
    pub fn raw(&self) -> String {
        match self {
            Block::Heading(h) => h.raw.clone(),
            Block::Paragraph(t) | Block::Table(t) | Block::Blank(t) => t.raw.clone(),
            Block::Callout(c) => c.raw.clone(),
            Block::Code(code) => {
                let mut raw = String::with_capacity(
                    code.open_fence.len() + code.text.len() + code.close_fence.len(),
                );
                raw.push_str(&code.open_fence);
                raw.push_str(&code.text);
                raw.push_str(&code.close_fence);
                raw
            }
        }
    }

    /// 1-based line on which the block starts.
    pub fn line(&self) -> usize {
        match self {
            Block::Heading(h) => h.line,
            Block::Paragraph(t) | Block::Table(t) | Block::Blank(t) => t.line,
            Block::Callout(c) => c.line,
            Block::Code(code) => code.line(),
        }
    }
}

/// A parsed documentation page.
///
/// Documents are immutable once the loader has built them.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    path: DocPath,
    title: String,
    bom: bool,
    front_matter: Option<FrontMatter>,
    blocks: Vec<Block>,
    links: Vec<LinkReference>,
    anchors: BTreeSet<String>,
}

impl Document {
    pub fn builder(path: DocPath) -> DocumentBuilder {
        DocumentBuilder::new(path)
    }

    pub fn path(&self) -> &DocPath {
        &self.path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.front_matter
            .as_ref()
            .and_then(|fm| fm.description.as_deref())
    }

    pub fn front_matter(&self) -> Option<&FrontMatter> {
        self.front_matter.as_ref()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn links(&self) -> &[LinkReference] {
        &self.links
    }

    pub fn anchors(&self) -> &BTreeSet<String> {
        &self.anchors
    }

    pub fn has_anchor(&self, anchor: &str) -> bool {
        self.anchors.contains(anchor)
    }

    pub fn headings(&self) -> impl Iterator<Item = &Heading> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Heading(h) => Some(h),
            _ => None,
        })
    }

    pub fn code_blocks(&self) -> impl Iterator<Item = &CodeBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Code(c) => Some(c),
            _ => None,
        })
    }

    /// Whether this page is a directory landing page (`README.md`, `index.md`).
    pub fn is_index(&self) -> bool {
        is_index_name(self.path.file_stem())
    }

    /// Preference among a directory's landing pages, lowest first.
    pub fn landing_rank(&self) -> Option<u8> {
        landing_rank(self.path.file_stem())
    }

    /// Re-serializes the document exactly as it was read.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push('\u{FEFF}');
        }
        if let Some(fm) = &self.front_matter {
            out.push_str(&fm.raw);
        }
        for block in &self.blocks {
            out.push_str(&block.raw());
        }
        out
    }
}

/// Returns true for stems that name a directory landing page.
pub fn is_index_name(stem: &str) -> bool {
    landing_rank(stem).is_some()
}

/// `README` is preferred over `index`, ignoring case.
pub fn landing_rank(stem: &str) -> Option<u8> {
    if stem.eq_ignore_ascii_case("readme") {
        Some(0)
    } else if stem.eq_ignore_ascii_case("index") {
        Some(1)
    } else {
        None
    }
}

/// Builder for [`Document`].
#[derive(Debug)]
pub struct DocumentBuilder {
    path: DocPath,
    bom: bool,
    front_matter: Option<FrontMatter>,
    blocks: Vec<Block>,
    links: Vec<LinkReference>,
    anchors: BTreeSet<String>,
    title: Option<String>,
}

impl DocumentBuilder {
    fn new(path: DocPath) -> Self {
        Self {
            path,
            bom: false,
            front_matter: None,
            blocks: Vec::new(),
            links: Vec::new(),
            anchors: BTreeSet::new(),
            title: None,
        }
    }

    pub fn bom(mut self, bom: bool) -> Self {
        self.bom = bom;
        self
    }

    pub fn front_matter(mut self, front_matter: Option<FrontMatter>) -> Self {
        self.front_matter = front_matter;
        self
    }

    pub fn blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn links(mut self, links: Vec<LinkReference>) -> Self {
        self.links = links;
        self
    }

    pub fn anchors(mut self, anchors: impl IntoIterator<Item = String>) -> Self {
        self.anchors.extend(anchors);
        self
    }

    /// Overrides the derived title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Builds the document, deriving the title when none was set.
    ///
    /// Title precedence: explicit title, front matter `title`, the first
    /// level-1 heading, then the file stem (the directory name for index pages).
    pub fn build(self) -> Document {
        let title = self
            .title
            .or_else(|| self.front_matter.as_ref().and_then(|fm| fm.title.clone()))
            .or_else(|| {
                self.blocks.iter().find_map(|b| match b {
                    Block::Heading(h) if h.level == 1 && !h.text.is_empty() => Some(h.text.clone()),
                    _ => None,
                })
            })
            .unwrap_or_else(|| fallback_title(&self.path));

        let mut anchors = self.anchors;
        for block in &self.blocks {
            if let Block::Heading(h) = block {
                anchors.insert(h.slug.clone());
            }
        }

        Document {
            path: self.path,
            title,
            bom: self.bom,
            front_matter: self.front_matter,
            blocks: self.blocks,
            links: self.links,
            anchors,
        }
    }
}

fn fallback_title(path: &DocPath) -> String {
    let stem = path.file_stem();
    if is_index_name(stem)
        && let Some(dir) = path.dir_segments().last()
    {
        return (*dir).to_string();
    }
    stem.to_string()
}
