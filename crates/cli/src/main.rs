//! Cravely cart CLI

use std::{io, process::ExitCode};

use crate::config::Cli;

mod commands;
mod config;
mod observability;

/// Cravely cart CLI entry point
#[tokio::main(flavor = "current_thread")]
pub async fn main() -> ExitCode {
    let cli = match Cli::load() {
        Ok(cli) => cli,
        Err(error) => {
            // clap renders help and version through the error path too
            _ = error.print();

            return if error.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(error) = observability::init_subscriber(&cli.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized, must use eprintln for setup errors"
        )]
        {
            eprintln!("{error}");
        }

        return ExitCode::FAILURE;
    }

    let mut out = io::stdout().lock();

    if let Err(error) = commands::run(&cli.store, cli.command, &mut out) {
        #[expect(
            clippy::print_stderr,
            reason = "user-facing error message for the CLI"
        )]
        {
            eprintln!("{error}");
        }

        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
