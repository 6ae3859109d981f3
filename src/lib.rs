//! # guidepack
//!
//! Turns a flat directory of Markdown guides into a tarball of HTML pages.
//!
//! # Architecture: Five-Stage Pipeline
//!
//! ```text
//! 1. Validate  guide/       must exist
//! 2. List      guide/*.md   sorted, flat, regular files only
//! 3. Render    *.md      →  dist/*.html     (external renderer, one call per file)
//! 4. Rewrite   dist/*.html  `.md` → `.html` in place
//! 5. Archive   dist/     →  dist.tar.gz     (root entry `dist/`)
//! ```
//!
//! Stages run one after another on a single thread and the first error aborts
//! the build. The output directory is wiped at the start of every build, so
//! it always mirrors the current sources exactly: one HTML page per Markdown
//! file, same order, same names apart from the extension.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stages 1–2: source directory validation and listing |
//! | [`render`] | Stage 3: the [`render::Renderer`] trait and the external-command implementation |
//! | [`links`] | Stage 4: textual link rewriting with atomic in-place replacement |
//! | [`archive`] | Stage 5: reproducible `.tar.gz` of the output tree |
//! | [`pipeline`] | Runs the stages in order, reports progress events |
//! | [`config`] | `guidepack.toml` loading, defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Rendering Is Delegated
//!
//! guidepack does not parse Markdown. The renderer (by default
//! [grip](https://github.com/joeyespo/grip), which produces GitHub-styled
//! pages) is spawned with an argument vector, never a shell string, so file
//! names cannot inject commands, and its exit status is always checked.
//!
//! ## Reproducible Archives
//!
//! Archive entries are sorted and their metadata normalized, so rebuilding
//! unchanged sources with a deterministic renderer yields a byte-identical
//! tarball. See [`archive`].
//!
//! ## Nothing Half-Written
//!
//! Link rewriting and archive creation both write to a temporary file and
//! rename it over the target. Readers see the old file or the new one, and a
//! failed build never leaves a truncated archive behind.

pub mod archive;
pub mod config;
pub mod links;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod scan;
