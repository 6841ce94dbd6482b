//! Hammer CLI - Command-line utility for extracting, creating, testing and
//! editing archives.

mod cli;
mod commands;
mod error;
mod output;
mod progress;

use clap::Parser;
use progress::CliProgress;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    init_tracing(cli.verbose);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    let show_progress = CliProgress::should_show(cli.quiet, cli.json);

    let outcome = match &cli.command {
        cli::Commands::Extract(args) => {
            commands::extract::execute(args, &*formatter, show_progress)
        }
        cli::Commands::Compress(args) => {
            commands::compress::execute(args, &*formatter, show_progress)
        }
        cli::Commands::List(args) => commands::list::execute(args, &*formatter),
        cli::Commands::Info(args) => commands::info::execute(args, &*formatter),
        cli::Commands::Test(args) => commands::test::execute(args, &*formatter, show_progress),
        cli::Commands::Add(args) => commands::add::execute(args, &*formatter, show_progress),
        cli::Commands::Delete(args) => {
            commands::delete::execute(args, &*formatter, show_progress)
        }
        cli::Commands::Formats => commands::formats::execute(&*formatter),
        cli::Commands::Completion { shell } => {
            commands::completion::execute(*shell);
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            formatter.format_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so that stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
