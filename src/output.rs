//! CLI output formatting.
//!
//! Each stage announces itself with a `==>` line; per-file detail is indented
//! underneath. Pages are shown by file name with a positional index, not by
//! their absolute paths.
//!
//! ```text
//! ==> Found 2 files in guide
//!     001 a.md
//!     002 b.md
//! ==> Rendering 2 files
//!     001 a.md → a.html
//!     002 b.md → b.html
//! ==> Replacing links in 2 files
//! ==> Creating archive dist.tar.gz from dist
//! ==> Done: 2 pages, 3 links rewritten → dist.tar.gz (3 entries)
//! ```
//!
//! `format_*` functions are pure and return lines for testability; `print_*`
//! wrappers write them to stdout.

use crate::pipeline::{BuildEvent, CheckReport};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Format one build progress event as display lines.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::SourcesFound { source_dir, files } => {
            let mut lines = vec![format!(
                "==> Found {} in {}",
                plural(files.len(), "file", "files"),
                source_dir.display()
            )];
            for (i, name) in files.iter().enumerate() {
                lines.push(format!("    {} {}", format_index(i + 1), name));
            }
            lines
        }
        BuildEvent::RenderStarted { count } => {
            vec![format!("==> Rendering {}", plural(*count, "file", "files"))]
        }
        BuildEvent::PageRendered {
            index,
            source,
            destination,
        } => vec![format!(
            "    {} {} \u{2192} {}",
            format_index(*index),
            file_name(source),
            file_name(destination)
        )],
        BuildEvent::RewriteStarted { count } => {
            vec![format!("==> Replacing links in {}", plural(*count, "file", "files"))]
        }
        BuildEvent::ArchiveStarted { output_dir, archive } => vec![format!(
            "==> Creating archive {} from {}",
            archive.display(),
            output_dir.display()
        )],
        BuildEvent::Finished(report) => vec![format!(
            "==> Done: {}, {} rewritten \u{2192} {} ({})",
            plural(report.pages.len(), "page", "pages"),
            plural(report.links_rewritten, "link", "links"),
            report.archive.path.display(),
            plural(report.archive.entries, "entry", "entries")
        )],
    }
}

/// Print one build event to stdout.
pub fn print_build_event(event: &BuildEvent) {
    for line in format_build_event(event) {
        println!("{}", line);
    }
}

/// Format the result of `check`.
pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = vec![format!(
        "==> Checking {} ({})",
        report.source_dir.display(),
        plural(report.files.len(), "file", "files")
    )];
    for (i, name) in report.files.iter().enumerate() {
        lines.push(format!("    {} {}", format_index(i + 1), name));
    }
    let status = if report.renderer_available {
        "found"
    } else {
        "NOT FOUND"
    };
    lines.push(format!("==> Renderer {}: {}", report.renderer, status));
    lines
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}
