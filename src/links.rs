//! Stage 4: point links at the rendered pages.
//!
//! Rendered HTML still links to `other.md`. Every literal `.md` in each output
//! file becomes `.html`. The substitution is purely textual, so it also touches
//! prose, code samples and anything else that happens to contain `.md`.
//!
//! Pages are handled as raw bytes, so a page that is not valid UTF-8 is
//! rewritten like any other.
//!
//! Each file is rewritten through a temporary file in the same directory which
//! then replaces the original with a rename. A crash mid-write leaves either
//! the old file or the new one at the final path, never a truncated one, and
//! the temporary file is removed on every error path.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

const FROM: &str = ".md";
const TO: &str = ".html";

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Failed to read {path}: {error}")]
    Read {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("Failed to write {path}: {error}")]
    Write {
        path: PathBuf,
        error: std::io::Error,
    },
}

/// Replace every `.md` in `text` with `.html`, returning the new text and the
/// number of replacements.
pub fn rewrite_links(text: &str) -> (String, usize) {
    let count = text.matches(FROM).count();
    if count == 0 {
        return (text.to_string(), 0);
    }
    (text.replace(FROM, TO), count)
}

/// Byte-level counterpart of [`rewrite_links`] for pages of unknown encoding.
pub fn rewrite_link_bytes(bytes: &[u8]) -> (Vec<u8>, usize) {
    let from = FROM.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut count = 0;
    let mut rest = bytes;
    while !rest.is_empty() {
        if rest.starts_with(from) {
            out.extend_from_slice(TO.as_bytes());
            rest = &rest[from.len()..];
            count += 1;
        } else {
            out.push(rest[0]);
            rest = &rest[1..];
        }
    }
    (out, count)
}

/// Rewrite one file in place. Returns the number of replacements.
///
/// Files with nothing to replace are left untouched.
pub fn rewrite_file(path: &Path) -> Result<usize, RewriteError> {
    let bytes = fs::read(path).map_err(|error| RewriteError::Read {
        path: path.to_path_buf(),
        error,
    })?;

    let (rewritten, count) = rewrite_link_bytes(&bytes);
    if count > 0 {
        replace_contents(path, &rewritten).map_err(|error| RewriteError::Write {
            path: path.to_path_buf(),
            error,
        })?;
    }
    log::debug!("rewrote {} link(s) in {}", count, path.display());
    Ok(count)
}

/// Rewrite every file in order. Returns the total number of replacements.
pub fn rewrite_all(paths: &[PathBuf]) -> Result<usize, RewriteError> {
    let mut total = 0;
    for path in paths {
        total += rewrite_file(path)?;
    }
    Ok(total)
}

/// Atomically replace `path` with `contents`, keeping its permissions.
///
/// The temp file lives next to the target so the final rename never crosses
/// a filesystem boundary. Dropping it unpersisted deletes it.
fn replace_contents(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path)?.permissions();
    let mut tmp = NamedTempFile::new_in(dir)?;
    // Temp files are created owner-only; the page keeps its original mode.
    tmp.as_file().set_permissions(permissions)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
