//! The build: validate → list → render → rewrite → archive.
//!
//! Stages run strictly one after another and the first error ends the build.
//! Nothing is retried and nothing is cleaned up after a failure: a renderer
//! error leaves a partially populated output directory behind, and no archive
//! is written.
//!
//! The output directory is only touched once the source directory has been
//! validated and listed, so a missing or malformed source never costs the
//! previous build's output.

use crate::archive::{self, ArchiveError, ArchiveSummary};
use crate::config::BuildConfig;
use crate::links::{self, RewriteError};
use crate::render::{self, CommandRenderer, RenderError, Renderer};
use crate::scan::{self, ScanError, SourceFile};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Failed to prepare output directory {path}: {error}")]
    Prepare {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Progress notifications, in the order a successful build emits them.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    SourcesFound {
        source_dir: PathBuf,
        files: Vec<String>,
    },
    RenderStarted {
        count: usize,
    },
    PageRendered {
        index: usize,
        source: PathBuf,
        destination: PathBuf,
    },
    RewriteStarted {
        count: usize,
    },
    ArchiveStarted {
        output_dir: PathBuf,
        archive: PathBuf,
    },
    Finished(BuildReport),
}

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    /// Absolute paths of the rendered pages, in source order.
    pub pages: Vec<PathBuf>,
    /// Total `.md` → `.html` replacements across all pages.
    pub links_rewritten: usize,
    pub archive: ArchiveSummary,
}

/// Run a full build.
///
/// `on_event` receives progress as it happens; pass `|_| {}` to ignore it.
pub fn build(
    config: &BuildConfig,
    renderer: &dyn Renderer,
    mut on_event: impl FnMut(&BuildEvent),
) -> Result<BuildReport, BuildError> {
    let files = scan::scan(&config.source_dir)?;
    on_event(&BuildEvent::SourcesFound {
        source_dir: config.source_dir.clone(),
        files: files.iter().map(|f| f.name.clone()).collect(),
    });

    prepare_output_dir(&config.output_dir)?;

    on_event(&BuildEvent::RenderStarted { count: files.len() });
    let pages = render_pages(config, renderer, &files, &mut on_event)?;

    on_event(&BuildEvent::RewriteStarted { count: pages.len() });
    let links_rewritten = links::rewrite_all(&pages)?;

    on_event(&BuildEvent::ArchiveStarted {
        output_dir: config.output_dir.clone(),
        archive: config.archive.clone(),
    });
    let archive = archive::create_archive(&config.output_dir, &config.archive)?;

    let report = BuildReport {
        pages,
        links_rewritten,
        archive,
    };
    on_event(&BuildEvent::Finished(report.clone()));
    Ok(report)
}

fn render_pages(
    config: &BuildConfig,
    renderer: &dyn Renderer,
    files: &[SourceFile],
    on_event: &mut impl FnMut(&BuildEvent),
) -> Result<Vec<PathBuf>, RenderError> {
    render::render_all(
        renderer,
        files,
        &config.source_dir,
        &config.output_dir,
        |index, target| {
            on_event(&BuildEvent::PageRendered {
                index,
                source: target.source.clone(),
                destination: target.destination.clone(),
            })
        },
    )
}

/// Outcome of a dry run over the sources.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub source_dir: PathBuf,
    pub files: Vec<String>,
    pub renderer: String,
    pub renderer_available: bool,
}

/// Validate and list the sources and probe the renderer, writing nothing.
pub fn check(config: &BuildConfig, renderer: &CommandRenderer) -> Result<CheckReport, BuildError> {
    let files = scan::scan(&config.source_dir)?;
    Ok(CheckReport {
        source_dir: config.source_dir.clone(),
        files: files.into_iter().map(|f| f.name).collect(),
        renderer: renderer.program().to_string(),
        renderer_available: renderer.is_available(),
    })
}

/// Delete `path` if it exists and create it empty.
pub fn prepare_output_dir(path: &Path) -> Result<(), BuildError> {
    let prepare = || -> std::io::Result<()> {
        if path.exists() {
            log::debug!("removing previous output {}", path.display());
            if path.is_dir() {
                fs::remove_dir_all(path)?;
            } else {
                fs::remove_file(path)?;
            }
        }
        fs::create_dir_all(path)
    };
    prepare().map_err(|error| BuildError::Prepare {
        path: path.to_path_buf(),
        error,
    })
}
