//! Output: the static HTML site and the diagnostics report.

mod html;
mod report;
mod site;

pub use html::render_body;
pub use report::{DiagnosticRecord, REPORT_FILE, Report, ReportError};
pub use site::{
    PAGE_TEMPLATE, STYLESHEET, STYLESHEET_FILE, SiteConfig, SiteError, SiteResult, generate_site,
};
