use clap::{Parser, Subcommand};
use guidepack::config::{self, BuildConfig, Overrides};
use guidepack::render::CommandRenderer;
use guidepack::{output, pipeline};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "guidepack")]
#[command(about = "Render Markdown guides to HTML and package them as a tarball")]
#[command(long_about = "\
Render Markdown guides to HTML and package them as a tarball

Every Markdown file directly inside the source directory is rendered to HTML
by an external program (grip by default), links between pages are rewritten
from .md to .html, and the output directory is packed into a .tar.gz.

  guide/                 dist/              dist.tar.gz
  ├── index.md     →     ├── index.html  →  dist/index.html
  └── install.md         └── install.html   dist/install.html

The output directory is deleted and recreated on every build.

Settings are read from guidepack.toml when present; flags override it.
Run 'guidepack gen-config' to print a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file [default: guidepack.toml, if present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Markdown source directory [default: guide]
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Output directory, wiped on every build [default: dist]
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Archive path [default: dist.tar.gz]
    #[arg(long, global = true)]
    archive: Option<PathBuf>,

    /// Log every command and file operation
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: list → render → rewrite links → archive (default)
    Build,
    /// Validate the sources and look for the renderer without writing anything
    Check,
    /// Print a stock guidepack.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Some(Command::GenConfig) => {
            print!("{}", config::stock_config_toml());
        }
        Some(Command::Check) => {
            let config = load_config(&cli)?;
            let renderer = CommandRenderer::new(&config.renderer);
            let report = pipeline::check(&config, &renderer)?;
            output::print_check_output(&report);
            if !report.renderer_available {
                return Err(format!("renderer `{}` could not be started", report.renderer).into());
            }
            println!("==> Sources are valid");
        }
        Some(Command::Build) | None => {
            let config = load_config(&cli)?;
            let renderer = CommandRenderer::new(&config.renderer);
            pipeline::build(&config, &renderer, output::print_build_event)?;
        }
    }

    Ok(())
}

/// `-v` forces debug; otherwise `RUST_LOG` applies, defaulting to warnings.
fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

/// File config (explicit or default location), then flags, then validation.
fn load_config(cli: &Cli) -> Result<BuildConfig, config::ConfigError> {
    let file_config = match &cli.config {
        Some(path) => config::load_required_config(path)?,
        None => config::load_config(std::path::Path::new(config::DEFAULT_CONFIG_FILE))?,
    };
    let config = file_config.apply(Overrides {
        source_dir: cli.source.clone(),
        output_dir: cli.output.clone(),
        archive: cli.archive.clone(),
    });
    config.validate()?;
    Ok(config)
}
