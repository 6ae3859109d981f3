//! Stage 3: render each Markdown file to HTML with an external program.
//!
//! guidepack does no Markdown rendering of its own. Each source file is handed
//! to a renderer (by default `grip --gfm --wide --export`) together with the
//! destination path:
//!
//! ```text
//! grip --gfm --wide --export /abs/guide/install.md /abs/dist/install.html
//! ```
//!
//! Both paths are absolute, the command is spawned with an argument vector
//! (never through a shell), and it must exit 0 and leave the destination file
//! behind. Anything else aborts the build. There is no timeout: a renderer
//! that hangs hangs the build.
//!
//! The [`Renderer`] trait is the seam tests use to stand in for the real
//! program.

use crate::config::RendererConfig;
use crate::scan::{MARKDOWN_SUFFIX, SourceFile};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

/// Suffix given to rendered files.
pub const HTML_SUFFIX: &str = ".html";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to run renderer `{program}`: {error}")]
    Spawn {
        program: String,
        error: std::io::Error,
    },
    #[error("Renderer failed on {input} ({status}): {stderr}")]
    Failed {
        input: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
    #[error("Renderer reported success but wrote no file at {0}")]
    MissingOutput(PathBuf),
}

/// Absolute input and output paths for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Anything that can turn one Markdown file into one HTML file.
pub trait Renderer {
    fn render(&self, source: &Path, destination: &Path) -> Result<(), RenderError>;
}

/// Renderer backed by an external program.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build the command line for one page without running it.
    pub fn command(&self, source: &Path, destination: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(source).arg(destination);
        cmd
    }

    /// Check whether the program can be spawned at all.
    ///
    /// Runs `<program> --version` with output discarded. Only a failure to
    /// start counts; the exit status is ignored.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }
}

impl Renderer for CommandRenderer {
    fn render(&self, source: &Path, destination: &Path) -> Result<(), RenderError> {
        let mut cmd = self.command(source, destination);
        log::debug!("running {:?}", cmd);

        let output = cmd.stdin(Stdio::null()).output().map_err(|error| RenderError::Spawn {
            program: self.program.clone(),
            error,
        })?;

        if !output.status.success() {
            return Err(RenderError::Failed {
                input: source.to_path_buf(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Swap the trailing `.md` of a source file name for `.html`.
pub fn html_file_name(markdown_name: &str) -> String {
    let stem = markdown_name
        .strip_suffix(MARKDOWN_SUFFIX)
        .unwrap_or(markdown_name);
    format!("{stem}{HTML_SUFFIX}")
}

/// Resolve the absolute source and destination paths for one file.
pub fn render_target(
    file: &SourceFile,
    source_dir: &Path,
    output_dir: &Path,
) -> Result<RenderTarget, RenderError> {
    Ok(RenderTarget {
        source: std::path::absolute(file.path_in(source_dir))?,
        destination: std::path::absolute(output_dir.join(html_file_name(&file.name)))?,
    })
}

/// Render every file in order, stopping at the first failure.
///
/// `on_rendered` is called after each page is written. Returns the
/// destination paths in the same order as `files`.
pub fn render_all(
    renderer: &dyn Renderer,
    files: &[SourceFile],
    source_dir: &Path,
    output_dir: &Path,
    mut on_rendered: impl FnMut(usize, &RenderTarget),
) -> Result<Vec<PathBuf>, RenderError> {
    let mut rendered = Vec::with_capacity(files.len());
    for (i, file) in files.iter().enumerate() {
        let target = render_target(file, source_dir, output_dir)?;
        renderer.render(&target.source, &target.destination)?;
        if !target.destination.is_file() {
            return Err(RenderError::MissingOutput(target.destination));
        }
        on_rendered(i + 1, &target);
        rendered.push(target.destination);
    }
    Ok(rendered)
}
