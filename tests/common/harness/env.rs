//! Isolated test environment with temp directory.

// Allow dead code since this is a test utility shared by several test crates
#![allow(dead_code)]

use super::{FolioCommand, TestPage};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated test environment with a temporary content root.
///
/// The root lives in `content/` and the default site output in
/// `content/_site/`; everything is cleaned up on drop.
pub struct TestEnv {
    /// The temporary directory (kept for lifetime management)
    temp_dir: TempDir,
    /// Path to the content root
    root: PathBuf,
}

impl TestEnv {
    /// Creates a new isolated test environment with an empty content root.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("content");
        std::fs::create_dir_all(&root).expect("Failed to create content root");
        Self { temp_dir, root }
    }

    /// Returns the path to the content root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the default site output directory.
    pub fn site_dir(&self) -> PathBuf {
        self.root.join("_site")
    }

    /// Returns a path outside the content root, for explicit outputs.
    pub fn scratch(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes a document under the root, creating parent directories.
    pub fn write_doc(&self, path: &str, content: &str) -> PathBuf {
        self.write_bytes(path, content.as_bytes())
    }

    /// Writes a page built with [`TestPage`].
    pub fn add_page(&self, path: &str, page: &TestPage) -> PathBuf {
        self.write_doc(path, &page.to_markdown())
    }

    /// Writes raw bytes under the root, creating parent directories.
    pub fn write_bytes(&self, path: &str, content: &[u8]) -> PathBuf {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(&full, content).expect("Failed to write file");
        full
    }

    /// Reads a file from the site output.
    pub fn read_site(&self, path: &str) -> String {
        std::fs::read_to_string(self.site_dir().join(path))
            .unwrap_or_else(|e| panic!("Failed to read site file {path}: {e}"))
    }

    /// Parses the report written to the default location.
    pub fn read_report(&self) -> Value {
        self.read_report_at(&self.site_dir().join("diagnostics.json"))
    }

    /// Parses a report file.
    pub fn read_report_at(&self, path: &Path) -> Value {
        let text = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read report {}: {e}", path.display()));
        serde_json::from_str(&text).expect("Report is not valid JSON")
    }

    /// Creates a FolioCommand.
    pub fn cmd(&self) -> FolioCommand {
        FolioCommand::new()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Kinds of every diagnostic in a report, in report order.
pub fn diagnostic_kinds(report: &Value) -> Vec<String> {
    report["diagnostics"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|d| d["kind"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_creates_root() {
        let env = TestEnv::new();
        assert!(env.root().is_dir());
        assert!(env.root().ends_with("content"));
    }

    #[test]
    fn test_write_doc_creates_parents() {
        let env = TestEnv::new();
        let path = env.write_doc("a/b/c.md", "# C\n");
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# C\n");
    }
}
