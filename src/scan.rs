//! Source discovery: stages 1 and 2 of the build pipeline.
//!
//! The source directory is flat. Every regular file directly inside it is a
//! Markdown page; subdirectories are ignored and never recursed into.
//!
//! ```text
//! guide/
//! ├── getting-started.md   → dist/getting-started.html
//! ├── install.md           → dist/install.html
//! └── images/              # ignored
//! ```
//!
//! ## Ordering
//!
//! Files are returned sorted by name. The filesystem's own order is arbitrary,
//! and sorting is what makes repeated builds over the same directory produce
//! the same archive.
//!
//! ## Validation
//!
//! - The source directory must exist and be a directory.
//! - Every listed file must end in `.md` with a non-empty stem. Anything else
//!   fails the scan instead of being renamed into a mangled `.html` path.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix every source file must carry.
pub const MARKDOWN_SUFFIX: &str = ".md";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Path {0} does not exist")]
    MissingSource(PathBuf),
    #[error("Path {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("Not a Markdown file (expected a name ending in .md): {0}")]
    UnsupportedFile(PathBuf),
    #[error("File name is not valid UTF-8: {0}")]
    NonUtf8Name(PathBuf),
}

/// A Markdown file found directly inside the source directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Bare file name, e.g. `install.md`.
    pub name: String,
}

impl SourceFile {
    /// Full path of this file under `source_dir`.
    pub fn path_in(&self, source_dir: &Path) -> PathBuf {
        source_dir.join(&self.name)
    }
}

/// Confirm that `path` exists. Nothing is read or written.
pub fn validate_source_dir(path: &Path) -> Result<(), ScanError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ScanError::MissingSource(path.to_path_buf()))
    }
}

/// List the Markdown files directly inside `dir`, sorted by name.
pub fn list_sources(dir: &Path) -> Result<Vec<SourceFile>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        // Follows symlinks, so a link to a regular file counts as one.
        if !path.is_file() {
            continue;
        }
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| ScanError::NonUtf8Name(path.clone()))?;
        if !is_markdown_name(&name) {
            return Err(ScanError::UnsupportedFile(path));
        }
        files.push(SourceFile { name });
    }
    files.sort();
    Ok(files)
}

/// Validate the source directory and list it.
pub fn scan(source_dir: &Path) -> Result<Vec<SourceFile>, ScanError> {
    validate_source_dir(source_dir)?;
    list_sources(source_dir)
}

fn is_markdown_name(name: &str) -> bool {
    name.len() > MARKDOWN_SUFFIX.len() && name.ends_with(MARKDOWN_SUFFIX)
}
