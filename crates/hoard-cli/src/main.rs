use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::Level;

use hoard_gc::GcError;
use hoard_repo::ConfigError;
use hoard_rm::RmError;

mod cli;
mod commands;

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Configuration problems exit with 2, everything else with 1.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    let is_config = err.downcast_ref::<ConfigError>().is_some()
        || matches!(err.downcast_ref::<GcError>(), Some(GcError::Config(_)))
        || matches!(err.downcast_ref::<RmError>(), Some(RmError::Config(_)));
    if is_config {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(log_level(commands::configured_verbosity(&cli)))
        .with_writer(std::io::stderr)
        .init();

    match commands::run_command(cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(errors) => {
            eprintln!("{} {errors} error(s) occurred", "error:".red().bold());
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            exit_code(&err)
        }
    }
}
