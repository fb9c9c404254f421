//! File discovery, decoding and atomic writes.

use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Errors during file system operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("atomic write failed for {path}: {source}")]
    AtomicWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("invalid encoding in {path}: {encoding}")]
    InvalidEncoding { path: PathBuf, encoding: String },
}

impl FsError {
    /// Creates an appropriate FsError from an io::Error.
    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => FsError::NotFound { path: path.into() },
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied { path: path.into() },
            _ => FsError::Io {
                path: path.into(),
                source: error,
            },
        }
    }

    /// Returns true for decoding failures (as opposed to I/O failures).
    pub fn is_encoding(&self) -> bool {
        matches!(self, FsError::InvalidEncoding { .. })
    }
}

/// Decoded file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    /// Text with any UTF-8 byte order mark removed.
    pub text: String,
    /// Whether the file started with a UTF-8 byte order mark.
    pub bom: bool,
}

/// Reads a text file.
///
/// # Errors
///
/// Returns `FsError::NotFound` if the file doesn't exist.
/// Returns `FsError::PermissionDenied` if access is denied.
/// Returns `FsError::InvalidEncoding` if the file is not valid UTF-8.
pub fn read_text(path: &Path) -> Result<SourceText, FsError> {
    let bytes = std::fs::read(path).map_err(|e| FsError::from_io(path, e))?;
    decode_text(bytes, path)
}

/// Decodes already-read bytes as UTF-8 text.
///
/// # Errors
///
/// Returns `FsError::InvalidEncoding` if the bytes are UTF-16 (by byte order
/// mark) or not valid UTF-8.
pub fn decode_text(bytes: Vec<u8>, path: &Path) -> Result<SourceText, FsError> {
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Err(FsError::InvalidEncoding {
            path: path.into(),
            encoding: "UTF-16 LE detected (byte order mark FF FE); convert to UTF-8".into(),
        });
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Err(FsError::InvalidEncoding {
            path: path.into(),
            encoding: "UTF-16 BE detected (byte order mark FE FF); convert to UTF-8".into(),
        });
    }

    let content = String::from_utf8(bytes).map_err(|e| FsError::InvalidEncoding {
        path: path.into(),
        encoding: format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to()),
    })?;

    match content.strip_prefix('\u{FEFF}') {
        Some(stripped) => Ok(SourceText {
            text: stripped.to_string(),
            bom: true,
        }),
        None => Ok(SourceText {
            text: content,
            bom: false,
        }),
    }
}

/// Writes a file atomically, creating parent directories as needed.
///
/// Uses a temporary file in the target directory and an atomic rename so
/// readers never observe a partially written page.
///
/// # Errors
///
/// Returns `FsError::Io` if the directory or temporary file cannot be created,
/// `FsError::AtomicWrite` if the rename fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), FsError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| FsError::from_io(&parent, e))?;

    let mut temp = NamedTempFile::new_in(&parent).map_err(|e| FsError::Io {
        path: path.into(),
        source: e,
    })?;
    temp.write_all(contents).map_err(|e| FsError::Io {
        path: path.into(),
        source: e,
    })?;
    temp.persist(path).map_err(|e| FsError::AtomicWrite {
        path: path.into(),
        source: e.error,
    })?;
    Ok(())
}

/// Files found by [`scan_content_directory`].
#[derive(Debug, Default)]
pub struct ContentScan {
    /// Paths relative to the scanned directory, sorted lexicographically.
    pub files: Vec<PathBuf>,
    /// Entries the walk could not read, such as unreadable directories or
    /// symlink loops. Their subtrees are missing from `files`.
    pub skipped: Vec<ScanFailure>,
}

/// An entry the directory walk had to skip.
#[derive(Debug)]
pub struct ScanFailure {
    /// Relative to the scanned directory when possible.
    pub path: PathBuf,
    pub error: walkdir::Error,
}

/// Scans a directory recursively for content files.
///
/// Skips hidden files and directories (starting with `.`) and the `exclude`
/// directory, typically the site output when it lives under the root.
/// Entries that cannot be read are collected in [`ContentScan::skipped`].
///
/// # Errors
///
/// Returns `FsError::NotFound` if the directory doesn't exist.
/// Returns `FsError::NotADirectory` if the path is not a directory.
pub fn scan_content_directory(dir: &Path, exclude: Option<&Path>) -> Result<ContentScan, FsError> {
    if !dir.exists() {
        return Err(FsError::NotFound {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(FsError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let exclude = exclude.and_then(|p| p.canonicalize().ok());
    let mut scan = ContentScan::default();
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || (!is_hidden(e) && !is_excluded(e, exclude.as_deref())));
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if let Ok(relative) = entry.path().strip_prefix(dir) {
                    scan.files.push(relative.to_path_buf());
                }
            }
            Ok(_) => {}
            Err(error) => {
                let path = error
                    .path()
                    .map(|p| p.strip_prefix(dir).unwrap_or(p).to_path_buf())
                    .unwrap_or_else(|| dir.to_path_buf());
                scan.skipped.push(ScanFailure { path, error });
            }
        }
    }
    scan.files.sort();
    Ok(scan)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.'))
}

fn is_excluded(entry: &DirEntry, exclude: Option<&Path>) -> bool {
    let Some(exclude) = exclude else {
        return false;
    };
    entry.file_type().is_dir()
        && entry
            .path()
            .canonicalize()
            .is_ok_and(|p| p == exclude)
}

/// Returns true when the path has one of the given extensions (case-insensitive).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}
