//! Optional YAML front matter at the top of a page.

use serde::Deserialize;
use thiserror::Error;

use crate::domain::FrontMatter;

/// Errors during front matter parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid YAML in front matter: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("front matter must be a mapping")]
    NotAMapping,
}

/// Recognized front matter keys. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct Fields {
    title: Option<String>,
    description: Option<String>,
}

/// The front matter block split off the top of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrontMatter<'a> {
    /// Everything from the opening `---` through the closing delimiter line.
    pub raw: &'a str,
    /// The YAML between the delimiters.
    pub yaml: &'a str,
    /// Lines covered by `raw`.
    pub line_count: usize,
}

/// Splits front matter off the start of `content`.
///
/// # Format
/// ```text
/// ---
/// description: How the CLR lays out value types
/// ---
/// Body content here...
/// ```
///
/// Returns `None` when the content does not open with a `---` line or the
/// closing delimiter is missing; such content is ordinary Markdown (a leading
/// thematic break), not front matter.
pub fn split(content: &str) -> Option<RawFrontMatter<'_>> {
    let first_len = if content.starts_with("---\r\n") {
        5
    } else if content.starts_with("---\n") {
        4
    } else {
        return None;
    };

    let mut pos = first_len;
    let mut line_count = 1;
    for line in content[first_len..].split_inclusive('\n') {
        line_count += 1;
        let end = pos + line.len();
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return Some(RawFrontMatter {
                raw: &content[..end],
                yaml: &content[first_len..pos],
                line_count,
            });
        }
        pos = end;
    }
    None
}

/// Parses the YAML of a front matter block.
///
/// # Errors
///
/// Returns `ParseError` if the YAML is malformed or is not a mapping.
pub fn parse(raw: &RawFrontMatter<'_>) -> Result<FrontMatter, ParseError> {
    let fields: Fields = if raw.yaml.trim().is_empty() {
        Fields::default()
    } else {
        let value: serde_yaml::Value = serde_yaml::from_str(raw.yaml)?;
        if !value.is_mapping() {
            return Err(ParseError::NotAMapping);
        }
        serde_yaml::from_value(value)?
    };

    Ok(FrontMatter {
        raw: raw.raw.to_string(),
        line_count: raw.line_count,
        title: fields.title.filter(|t| !t.trim().is_empty()),
        description: fields.description,
    })
}
