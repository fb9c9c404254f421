//! File I/O, front matter, slugs, logging

pub mod frontmatter;
mod fs;
mod logging;
mod slug;

pub use fs::{
    ContentScan, FsError, ScanFailure, SourceText, decode_text, has_extension, read_text,
    scan_content_directory, write_atomic,
};
pub use logging::{LOG_ENV, LogFormat, init_logging, verbosity_to_directive};
pub use slug::{Slugger, slugify};
