//! Build configuration.
//!
//! Every setting has a default matching the classic layout (`guide/` in,
//! `dist/` and `dist.tar.gz` out, rendered with `grip`). An optional
//! `guidepack.toml` in the working directory overrides any subset of them:
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source_dir = "guide"       # Flat directory of Markdown files
//! output_dir = "dist"        # Wiped and recreated on every build
//! archive = "dist.tar.gz"    # Must live outside output_dir
//!
//! [renderer]
//! program = "grip"
//! args = ["--gfm", "--wide", "--export"]
//! ```
//!
//! Config files are sparse and merged key-by-key over the stock defaults.
//! Unknown keys are rejected to catch typos early. Command-line flags are
//! applied last, then the result is validated.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "guidepack.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything a build needs to know about where to read and write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory holding the Markdown sources. Not recursed into.
    pub source_dir: PathBuf,
    /// Directory receiving the rendered HTML. Deleted at the start of a build.
    pub output_dir: PathBuf,
    /// Path of the `.tar.gz` written at the end of a build.
    pub archive: PathBuf,
    /// External command used to turn one Markdown file into one HTML file.
    pub renderer: RendererConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("guide"),
            output_dir: PathBuf::from("dist"),
            archive: PathBuf::from("dist.tar.gz"),
            renderer: RendererConfig::default(),
        }
    }
}

/// Renderer command line. The source and destination paths are appended
/// after `args` as the final two positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "grip".to_string(),
            // GitHub-flavored, full width, static export instead of serving.
            args: vec![
                "--gfm".to_string(),
                "--wide".to_string(),
                "--export".to_string(),
            ],
        }
    }
}

/// Command-line overrides, applied on top of file config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub archive: Option<PathBuf>,
}

impl BuildConfig {
    /// Replace any setting given on the command line.
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(source) = overrides.source_dir {
            self.source_dir = source;
        }
        if let Some(output) = overrides.output_dir {
            self.output_dir = output;
        }
        if let Some(archive) = overrides.archive {
            self.archive = archive;
        }
        self
    }

    /// Reject configurations that would make a build destroy its own inputs
    /// or archive itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("source_dir must not be empty".into()));
        }
        if self.output_dir.file_name().is_none() {
            return Err(ConfigError::Validation(format!(
                "output_dir must name a directory, got {}",
                self.output_dir.display()
            )));
        }
        if self.archive.file_name().is_none() {
            return Err(ConfigError::Validation(format!(
                "archive must name a file, got {}",
                self.archive.display()
            )));
        }
        if self.renderer.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "renderer.program must not be empty".into(),
            ));
        }

        let output = std::path::absolute(&self.output_dir)?;
        let source = std::path::absolute(&self.source_dir)?;
        let archive = std::path::absolute(&self.archive)?;

        if source.starts_with(&output) {
            return Err(ConfigError::Validation(format!(
                "output_dir {} would delete source_dir {}",
                self.output_dir.display(),
                self.source_dir.display()
            )));
        }
        if archive.starts_with(&output) {
            return Err(ConfigError::Validation(format!(
                "archive {} must not be inside output_dir {}",
                self.archive.display(),
                self.output_dir.display()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Config loading and merging
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BuildConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value, or `None` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults and deserialize.
///
/// Validation is left to the caller, since command-line overrides may still
/// change the paths.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<BuildConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BuildConfig = merged.try_into()?;
    Ok(config)
}

/// Load config from `path`, falling back to defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<BuildConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Load config from a file the user named explicitly; a missing file is an error.
pub fn load_required_config(path: &Path) -> Result<BuildConfig, ConfigError> {
    match load_raw_config(path)? {
        Some(value) => resolve_config(Some(value)),
        None => Err(ConfigError::NotFound(path.to_path_buf())),
    }
}

/// Returns a fully-commented stock `guidepack.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# guidepack configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
#
# Command-line flags (--source, --output, --archive) override these.

# Flat directory of Markdown files. Every regular file in it must end in .md;
# subdirectories are ignored.
source_dir = "guide"

# Rendered HTML goes here. The directory is DELETED and recreated on every
# build, so never point it at anything you want to keep.
output_dir = "dist"

# Gzip-compressed tarball of output_dir. Its root entry is named after the
# last component of output_dir. Must not be inside output_dir.
archive = "dist.tar.gz"

# ---------------------------------------------------------------------------
# Renderer
# ---------------------------------------------------------------------------
[renderer]
# Program invoked once per Markdown file, as:
#   <program> <args...> <source.md> <destination.html>
# A non-zero exit status aborts the build.
program = "grip"

# GitHub-flavored rendering, full-width layout, static export.
args = ["--gfm", "--wide", "--export"]
"##
}
