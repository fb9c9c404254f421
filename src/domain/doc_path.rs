//! Root-relative document paths.

use std::fmt;
use std::path::{Component, Path};

use serde::Serialize;
use thiserror::Error;

/// A root-relative, `/`-separated path identifying a file in the content tree.
///
/// Always normalized: no leading or trailing slash, no `.` or `..` segments,
/// no empty segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DocPath(String);

/// Error returned when a filesystem path cannot be represented as a `DocPath`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDocPathError {
    #[error("path is empty")]
    Empty,

    #[error("path is absolute: {0}")]
    Absolute(String),

    #[error("path escapes the content root: {0}")]
    EscapesRoot(String),

    #[error("path is not valid UTF-8: {0}")]
    NotUtf8(String),
}

impl DocPath {
    /// Builds a `DocPath` from a path relative to the content root.
    pub fn from_relative(path: &Path) -> Result<Self, ParseDocPathError> {
        let mut segments: Vec<String> = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| ParseDocPathError::NotUtf8(path.display().to_string()))?;
                    segments.push(part.to_string());
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if segments.pop().is_none() {
                        return Err(ParseDocPathError::EscapesRoot(path.display().to_string()));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ParseDocPathError::Absolute(path.display().to_string()));
                }
            }
        }
        if segments.is_empty() {
            return Err(ParseDocPathError::Empty);
        }
        Ok(Self(segments.join("/")))
    }

    /// Returns the path as a `/`-separated string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the directory part, `""` for files at the root.
    pub fn dir(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// Returns the final path segment.
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Returns the file name without its extension.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    /// Returns the extension, if any, without the leading dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// Returns the directory segments.
    pub fn dir_segments(&self) -> Vec<&str> {
        let dir = self.dir();
        if dir.is_empty() {
            Vec::new()
        } else {
            dir.split('/').collect()
        }
    }

    /// Number of directories between the root and this file.
    pub fn depth(&self) -> usize {
        self.0.matches('/').count()
    }

    /// Returns the lookup key; folds case on case-insensitive runs.
    pub fn key(&self, case_insensitive: bool) -> String {
        if case_insensitive {
            self.0.to_lowercase()
        } else {
            self.0.clone()
        }
    }

    /// Resolves a link target written in this document.
    ///
    /// `target` is interpreted relative to this document's directory, or
    /// relative to the content root when it starts with `/`. Returns the
    /// normalized root-relative path (`""` for the root itself), or `None`
    /// when the target escapes the root.
    pub fn join_link(&self, target: &str) -> Option<String> {
        let mut segments: Vec<&str> = if target.starts_with('/') {
            Vec::new()
        } else {
            self.dir_segments()
        };

        for part in target.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    segments.pop()?;
                }
                other => segments.push(other),
            }
        }

        Some(segments.join("/"))
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
