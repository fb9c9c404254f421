//! Outbound link references found in documents.

use crate::domain::DocPath;

/// Where a link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A URL with a scheme (`https:`, `mailto:`) or a protocol-relative `//host`.
    External(String),
    /// A path inside the content tree and/or an in-page fragment.
    Internal {
        /// Percent-decoded path; `None` for same-page `#fragment` links.
        path: Option<String>,
        /// Percent-decoded fragment without the leading `#`.
        anchor: Option<String>,
    },
}

impl LinkTarget {
    /// Classifies a raw link destination.
    ///
    /// Query strings are dropped. Returns `None` for empty destinations.
    pub fn parse(destination: &str) -> Option<Self> {
        let destination = destination.trim();
        if destination.is_empty() {
            return None;
        }
        if has_scheme(destination) || destination.starts_with("//") {
            return Some(LinkTarget::External(destination.to_string()));
        }

        let (before_fragment, anchor) = match destination.split_once('#') {
            Some((before, fragment)) => (before, Some(fragment)),
            None => (destination, None),
        };
        let path = before_fragment
            .split_once('?')
            .map_or(before_fragment, |(path, _)| path);

        let path = (!path.is_empty()).then(|| percent_decode(path));
        let anchor = anchor
            .filter(|a| !a.is_empty())
            .map(percent_decode);

        if path.is_none() && anchor.is_none() {
            return None;
        }
        Some(LinkTarget::Internal { path, anchor })
    }

    pub fn is_external(&self) -> bool {
        matches!(self, LinkTarget::External(_))
    }
}

/// A link from one document to a path and optional anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    /// Document containing the link.
    pub source: DocPath,
    /// 1-based line where the link starts.
    pub line: usize,
    /// Destination exactly as written.
    pub raw: String,
    pub target: LinkTarget,
}

impl LinkReference {
    pub fn new(source: DocPath, line: usize, raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let target = LinkTarget::parse(&raw)?;
        Some(Self {
            source,
            line,
            raw,
            target,
        })
    }
}

/// RFC 3986 scheme: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":".
fn has_scheme(s: &str) -> bool {
    let Some(colon) = s.find(':') else {
        return false;
    };
    let scheme = &s[..colon];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Decodes `%XX` escapes, leaving malformed escapes untouched.
pub(crate) fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2]))
        {
            out.push(hi * 16 + lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| s.to_string())
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
