//! Core types: Document, Block, CodeBlock, LinkReference, SiteTree, Diagnostic

mod diagnostic;
mod doc_path;
mod document;
mod link;
mod site_tree;

pub use diagnostic::{
    Diagnostic, DiagnosticKind, DiagnosticLog, Severity, SeverityPolicy, SourceLocation,
};
pub use doc_path::{DocPath, ParseDocPathError};
pub use document::{
    Block, Callout, CalloutSyntax, CodeBlock, Document, DocumentBuilder, FrontMatter, Heading,
    TextBlock, is_index_name,
};
pub use link::{LinkReference, LinkTarget};
pub(crate) use link::percent_decode;
pub use site_tree::{PageEntry, SiteNode, SiteTree, relative_url};
