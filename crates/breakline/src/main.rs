//! # breakline
//!
//! Binary entry point: parses arguments, installs logging, dispatches.

#![deny(unsafe_code)]

use std::process::ExitCode;

use breakline::{Cli, execute};
use breakline_core::logging::{init_subscriber_with, level_for_verbosity};
use clap::Parser;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_subscriber_with(level_for_verbosity(cli.verbose), cli.log_format);

    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr();
    match execute(&cli, &mut stdout, &mut stderr) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(error = %format!("{error:#}"), "command failed");
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
