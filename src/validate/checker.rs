//! Snippet checkers and the registry that maps language tags to them.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::Path;
use std::process::{Output, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;

/// Result of checking one snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    /// The snippet is invalid; carries the checker's message.
    Failed(String),
    /// The checker could not run (missing tool, I/O failure).
    Unavailable(String),
}

/// Validates snippets of one language.
///
/// Implementations must not block the async runtime; CPU-bound work goes
/// on the blocking pool so a timeout can still fire.
#[async_trait]
pub trait SnippetChecker: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    async fn check(&self, source: &str) -> CheckOutcome;
}

/// A checker backed by an in-process parser.
#[derive(Debug, Clone, Copy)]
pub struct ParseChecker {
    name: &'static str,
    parse: fn(&str) -> Result<(), String>,
}

impl ParseChecker {
    pub fn json() -> Self {
        Self {
            name: "json",
            parse: parse_json,
        }
    }

    pub fn toml() -> Self {
        Self {
            name: "toml",
            parse: parse_toml,
        }
    }

    pub fn yaml() -> Self {
        Self {
            name: "yaml",
            parse: parse_yaml,
        }
    }
}

#[async_trait]
impl SnippetChecker for ParseChecker {
    fn name(&self) -> &str {
        self.name
    }

    async fn check(&self, source: &str) -> CheckOutcome {
        let parse = self.parse;
        let source = source.to_string();
        match tokio::task::spawn_blocking(move || parse(&source)).await {
            Ok(Ok(())) => CheckOutcome::Passed,
            Ok(Err(message)) => CheckOutcome::Failed(message),
            Err(e) => CheckOutcome::Unavailable(format!("checker task failed: {e}")),
        }
    }
}

fn parse_json(source: &str) -> Result<(), String> {
    serde_json::from_str::<serde_json::Value>(&strip_json_comments(source))
        .map(|_| ())
        .map_err(|e| e.to_string())
}

fn parse_toml(source: &str) -> Result<(), String> {
    toml::from_str::<toml::Table>(source)
        .map(|_| ())
        .map_err(|e| e.message().to_string())
}

fn parse_yaml(source: &str) -> Result<(), String> {
    for document in serde_yaml::Deserializer::from_str(source) {
        serde_yaml::Value::deserialize(document).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Blanks `//` and `/* */` comments outside strings, keeping line breaks
/// so error positions still match the snippet.
fn strip_json_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek().copied()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Errors building checkers from configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckerError {
    #[error("checker '{0}' has an empty command")]
    EmptyCommand(String),
}

/// Configuration of an external command checker.
///
/// ```toml
/// [checkers.csharp]
/// command = ["dotnet", "script", "{file}"]
/// extension = "csx"
/// aliases = ["cs", "c#"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckerSpec {
    /// Program and arguments; `{file}` and `{dir}` are substituted.
    pub command: Vec<String>,
    /// Extension of the temporary snippet file; defaults to the language name.
    pub extension: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Runs an external program on a temporary file holding the snippet.
#[derive(Debug, Clone)]
pub struct CommandChecker {
    name: String,
    command: Vec<String>,
    extension: String,
}

impl CommandChecker {
    pub fn new(
        name: impl Into<String>,
        command: Vec<String>,
        extension: impl Into<String>,
    ) -> Result<Self, CheckerError> {
        let name = name.into();
        if command.is_empty() {
            return Err(CheckerError::EmptyCommand(name));
        }
        Ok(Self {
            name,
            command,
            extension: extension.into(),
        })
    }

    async fn run(&self, source: &str) -> io::Result<Output> {
        let dir = tempfile::TempDir::new()?;
        let file = dir.path().join(format!("snippet.{}", self.extension));
        tokio::fs::write(&file, source).await?;

        let argv: Vec<String> = self
            .command
            .iter()
            .map(|arg| substitute(arg, &file, dir.path()))
            .collect();
        Command::new(&argv[0])
            .args(&argv[1..])
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
    }
}

fn substitute(arg: &str, file: &Path, dir: &Path) -> String {
    arg.replace("{file}", &file.to_string_lossy())
        .replace("{dir}", &dir.to_string_lossy())
}

#[async_trait]
impl SnippetChecker for CommandChecker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, source: &str) -> CheckOutcome {
        match self.run(source).await {
            Ok(output) if output.status.success() => CheckOutcome::Passed,
            Ok(output) => CheckOutcome::Failed(failure_message(&output)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                CheckOutcome::Unavailable(format!("'{}' not found", self.command[0]))
            }
            Err(e) => CheckOutcome::Unavailable(e.to_string()),
        }
    }
}

const MAX_MESSAGE_LINES: usize = 20;

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    if text.is_empty() {
        return format!("exited with {}", output.status);
    }
    text.lines()
        .take(MAX_MESSAGE_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Maps language tags to checkers.
#[derive(Clone, Default)]
pub struct CheckerRegistry {
    checkers: HashMap<String, Arc<dyn SnippetChecker>>,
    aliases: HashMap<String, String>,
}

impl std::fmt::Debug for CheckerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.checkers.keys().collect();
        names.sort();
        f.debug_struct("CheckerRegistry")
            .field("checkers", &names)
            .field("aliases", &self.aliases.len())
            .finish()
    }
}

impl CheckerRegistry {
    /// A registry with no checkers: every snippet is unverified.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The in-process `json`, `toml` and `yaml` checkers plus common aliases.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("json", Arc::new(ParseChecker::json()));
        registry.register("toml", Arc::new(ParseChecker::toml()));
        registry.register("yaml", Arc::new(ParseChecker::yaml()));
        for (alias, name) in [
            ("yml", "yaml"),
            ("jsonc", "json"),
            ("cs", "csharp"),
            ("c#", "csharp"),
        ] {
            registry.alias(alias, name);
        }
        registry
    }

    /// Builtins plus the configured command checkers, which take precedence.
    pub fn from_specs(specs: &BTreeMap<String, CheckerSpec>) -> Result<Self, CheckerError> {
        let mut registry = Self::with_builtins();
        for (language, spec) in specs {
            let extension = spec.extension.clone().unwrap_or_else(|| language.clone());
            let checker = CommandChecker::new(language.clone(), spec.command.clone(), extension)?;
            registry.register(language, Arc::new(checker));
            for alias in &spec.aliases {
                registry.alias(alias, language);
            }
        }
        Ok(registry)
    }

    pub fn register(&mut self, language: &str, checker: Arc<dyn SnippetChecker>) {
        self.checkers.insert(language.to_lowercase(), checker);
    }

    pub fn alias(&mut self, alias: &str, language: &str) {
        self.aliases
            .insert(alias.to_lowercase(), language.to_lowercase());
    }

    /// Finds the checker for a language tag, following aliases.
    pub fn lookup(&self, language: &str) -> Option<Arc<dyn SnippetChecker>> {
        let language = language.to_lowercase();
        let canonical = self.aliases.get(&language).unwrap_or(&language);
        self.checkers.get(canonical).cloned()
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.checkers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
