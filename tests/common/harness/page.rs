//! Builder for test pages with sensible defaults.

// Allow dead code since this is a test utility shared by several test crates
#![allow(dead_code)]

/// Builder for creating Markdown test pages.
///
/// Pieces are appended in call order and separated by blank lines.
#[derive(Debug, Default)]
pub struct TestPage {
    front_matter: Vec<(String, String)>,
    parts: Vec<String>,
}

impl TestPage {
    /// Creates a page starting with a level-1 heading.
    pub fn new(title: impl Into<String>) -> Self {
        Self::default().heading(1, title)
    }

    /// Adds a front matter key.
    pub fn meta(mut self, key: &str, value: &str) -> Self {
        self.front_matter.push((key.to_string(), value.to_string()));
        self
    }

    pub fn heading(mut self, level: usize, text: impl Into<String>) -> Self {
        self.parts
            .push(format!("{} {}", "#".repeat(level), text.into()));
        self
    }

    pub fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.parts.push(text.into());
        self
    }

    /// Adds a paragraph holding one inline link.
    pub fn link(self, text: &str, destination: &str) -> Self {
        self.paragraph(format!("[{text}]({destination})"))
    }

    /// Adds a fenced code block.
    pub fn code(mut self, info: &str, body: &str) -> Self {
        let body = body.trim_end_matches('\n');
        self.parts.push(format!("```{info}\n{body}\n```"));
        self
    }

    /// Adds a GitBook hint.
    pub fn hint(mut self, style: &str, body: &str) -> Self {
        self.parts
            .push(format!("{{% hint style=\"{style}\" %}}\n{body}\n{{% endhint %}}"));
        self
    }

    /// Renders the page as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        if !self.front_matter.is_empty() {
            out.push_str("---\n");
            for (key, value) in &self.front_matter {
                out.push_str(&format!("{key}: {value}\n"));
            }
            out.push_str("---\n");
        }
        out.push_str(&self.parts.join("\n\n"));
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_renders_parts_in_order() {
        let page = TestPage::new("Intro")
            .meta("description", "About")
            .link("Next", "next.md")
            .code("json", "{}\n");

        assert_eq!(
            page.to_markdown(),
            "---\ndescription: About\n---\n# Intro\n\n[Next](next.md)\n\n```json\n{}\n```\n"
        );
    }
}
