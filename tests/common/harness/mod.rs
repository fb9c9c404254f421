//! Test harness for CLI integration tests.
//!
//! Provides isolated content trees, programmatic page creation,
//! and CLI assertion helpers using `assert_cmd`.

mod command;
mod env;
mod page;

// Re-export main types for external use
#[allow(unused_imports)]
pub use command::FolioCommand;
#[allow(unused_imports)]
pub use env::{TestEnv, diagnostic_kinds};
#[allow(unused_imports)]
pub use page::TestPage;
