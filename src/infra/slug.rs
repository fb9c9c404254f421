//! Anchor slug generation for headings.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static INLINE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("valid regex"));

/// Converts heading text to an anchor slug.
///
/// Follows the GitHub/GitBook convention:
/// - Inline links and images keep only their text
/// - Converts to lowercase
/// - Keeps letters, digits, hyphens and underscores; each space becomes a hyphen
/// - Drops all other characters
/// - Returns "section" for empty results
///
/// # Examples
///
/// ```
/// use folio::infra::slugify;
///
/// assert_eq!(slugify("Section 1"), "section-1");
/// assert_eq!(slugify("`Span<T>` and `Memory<T>`"), "spant-and-memoryt");
/// assert_eq!(slugify("???"), "section");
/// ```
pub fn slugify(heading: &str) -> String {
    let text = INLINE_LINK.replace_all(heading, "$1");

    let mut slug = String::with_capacity(text.len());
    for c in text.trim().to_lowercase().chars() {
        if c.is_alphanumeric() || c == '-' || c == '_' {
            slug.push(c);
        } else if c == ' ' {
            slug.push('-');
        }
    }

    if slug.is_empty() {
        return "section".to_string();
    }
    slug
}

/// Hands out slugs that are unique within one document.
///
/// A repeated heading gets `-1`, `-2`, ... appended, skipping any suffixed
/// form that is already taken.
#[derive(Debug, Default)]
pub struct Slugger {
    taken: HashSet<String>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the unique slug for the next heading with this text.
    pub fn slug(&mut self, heading: &str) -> String {
        self.unique(slugify(heading))
    }

    /// Claims an explicit heading id, suffixed like a slug when already taken.
    pub fn claim(&mut self, id: &str) -> String {
        self.unique(id.to_string())
    }

    fn unique(&mut self, base: String) -> String {
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
