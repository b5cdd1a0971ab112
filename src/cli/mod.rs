use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use plugin_validator::{Config, ValidatorError};

mod rules;
mod validate;

#[derive(Parser)]
#[command(
    name = "plugin-validator",
    version,
    about = "Marketplace plugin validator"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Show project information
    #[arg(long)]
    about: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    pub(crate) log_level: String,

    /// Verbose logging (same as --log-level debug)
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub(crate) no_color: bool,
}

/// Output format for reports and listings.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum Format {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// JSON document
    Json,
}

impl From<Format> for plugin_validator::Format {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => plugin_validator::Format::Text,
            Format::Json => plugin_validator::Format::Json,
        }
    }
}

#[derive(Subcommand)]
#[command(next_display_order = None)]
enum Commands {
    /// Validate a marketplace manifest and every plugin it lists
    Validate {
        /// Marketplace manifest (JSON or YAML)
        #[arg(conflicts_with = "plugin")]
        manifest: Option<PathBuf>,
        /// Validate a single plugin directory instead of a marketplace
        #[arg(long, value_name = "DIR")]
        plugin: Option<PathBuf>,
        /// Directory that manifest source paths are relative to
        #[arg(long, value_name = "DIR", conflicts_with = "plugin")]
        base_dir: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Configuration file (TOML)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Number of plugins validated in parallel (default: CPU count)
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
        workers: Option<u16>,
        /// Treat warnings as failures
        #[arg(long)]
        strict: bool,
    },
    /// List the active validation rules
    Rules {
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Configuration file (TOML)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    if cli.about {
        print_about();
        return ExitCode::SUCCESS;
    }
    let color = color_enabled(cli.no_color, std::io::stdout().is_terminal());

    match cli.command {
        Some(Commands::Validate {
            manifest,
            plugin,
            base_dir,
            format,
            config,
            workers,
            strict,
        }) => validate::run(validate::Options {
            manifest,
            plugin,
            base_dir,
            format: format.into(),
            config,
            workers: workers.map(usize::from),
            strict,
            color,
        }),
        Some(Commands::Rules { format, config }) => rules::run(format, config),
        None => {
            eprintln!("Usage: plugin-validator <command> [args]");
            eprintln!("Run `plugin-validator --help` for details.");
            ExitCode::from(2)
        }
    }
}

/// Color is used only on a terminal, and never when `--no-color` is given
/// or `NO_COLOR` is set to a non-empty value.
pub(crate) fn color_enabled(no_color: bool, is_terminal: bool) -> bool {
    let env_off = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    is_terminal && !no_color && !env_off
}

/// Load `--config`, or the defaults when none is given.
fn load_config(path: Option<&std::path::Path>) -> Result<Config, ValidatorError> {
    match path {
        Some(p) => Config::load(p),
        None => Ok(Config::default()),
    }
}

/// Print a run-level error and map it to its exit code.
fn fail(err: &ValidatorError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err.exit_code())
}

fn print_about() {
    println!(
        "plugin-validator: marketplace plugin validator\n\
         ├─ version:    {}\n\
         ├─ author:     {}\n\
         ├─ source:     {}\n\
         └─ licence:    {} https://www.apache.org/licenses/LICENSE-2.0",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_AUTHORS"),
        env!("CARGO_PKG_REPOSITORY"),
        env!("CARGO_PKG_LICENSE"),
    );
}
