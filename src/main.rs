use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_telemetry(&cli);
    cli::run(cli)
}

/// Logs go to stderr so stdout carries only the report.
fn init_telemetry(cli: &cli::Cli) {
    let level = if cli.verbose { "debug" } else { cli.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(cli::color_enabled(cli.no_color, std::io::stderr().is_terminal()))
        .init();
}
