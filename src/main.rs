//! Binary entrypoint for the `glimpse` CLI.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Diagnostics go to stderr; stdout carries command output only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glimpse=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Recording is handled in commands::dispatch via GLIMPSE_RECORD=<file>.
    match glimpse::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
