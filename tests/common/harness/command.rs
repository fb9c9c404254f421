//! Fluent wrapper around assert_cmd::Command.

// Allow dead code since this is a test utility shared by several test crates
#![allow(dead_code)]

use assert_cmd::Command;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Fluent wrapper around `assert_cmd::Command` for the `folio` binary.
///
/// Provides a builder-style API for constructing and executing CLI commands.
pub struct FolioCommand {
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl FolioCommand {
    /// Creates a new command for the `folio` binary.
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Adds arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Adds a path argument.
    pub fn path(self, path: &Path) -> Self {
        self.args([path.to_string_lossy()])
    }

    /// Sets an environment variable for the child process.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Returns the current arguments (for testing).
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Runs the command and returns an Assert for making assertions.
    #[allow(deprecated)]
    pub fn assert(self) -> assert_cmd::assert::Assert {
        let mut cmd = Command::cargo_bin("folio").expect("Failed to find folio binary");
        cmd.args(&self.args);
        // Keep user config and log settings out of the tests.
        cmd.env("XDG_CONFIG_HOME", std::env::temp_dir().join("folio-test-config"));
        cmd.env_remove("FOLIO_LOG");
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.assert()
    }

    /// Runs the command, expects success, and returns stdout as a string.
    pub fn output_success(self) -> String {
        let output = self.assert().success().get_output().stdout.clone();
        String::from_utf8(output).expect("Output was not valid UTF-8")
    }

    /// Runs the command, ignoring its exit status, and parses stdout as JSON.
    pub fn output_json<T: DeserializeOwned>(self) -> T {
        let output = self.assert().get_output().stdout.clone();
        serde_json::from_slice(&output).expect("Failed to parse output as JSON")
    }

    // ===========================================
    // Command Shortcuts
    // ===========================================

    /// Configures for the `build` command on a root.
    pub fn build(self, root: &Path) -> Self {
        self.args(["build"]).path(root)
    }

    /// Configures for the `check` command on a root.
    pub fn check(self, root: &Path) -> Self {
        self.args(["check"]).path(root)
    }

    // ===========================================
    // Options
    // ===========================================

    /// Adds `--format json` to the command.
    pub fn format_json(self) -> Self {
        self.args(["--format", "json"])
    }

    /// Adds `--output DIR`.
    pub fn output(self, dir: &Path) -> Self {
        self.args(["--output"]).path(dir)
    }

    /// Adds `--report FILE`.
    pub fn report(self, file: &Path) -> Self {
        self.args(["--report"]).path(file)
    }
}

impl Default for FolioCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_runs_binary() {
        FolioCommand::new().args(["--help"]).assert().success();
    }

    #[test]
    fn test_command_output_success() {
        let output = FolioCommand::new().args(["--help"]).output_success();
        assert!(output.contains("folio") || output.contains("documentation"));
    }

    #[test]
    fn test_command_shortcuts() {
        let temp = TempDir::new().unwrap();
        let cmd = FolioCommand::new().check(temp.path()).format_json();
        let args = cmd.get_args();
        assert_eq!(args[0], "check");
        assert_eq!(args[1], temp.path().to_string_lossy());
        assert!(args.contains(&"--format".to_string()));
        assert!(args.contains(&"json".to_string()));
    }
}
