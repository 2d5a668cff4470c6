//! Core library entry for the `glimpse` CLI.
//!
//! `glimpse` captures a running application (web page, terminal program,
//! desktop window or command output), asks a vision-capable oracle whether
//! the captures satisfy a task document's checklist, and ticks the items it
//! confirms.

pub mod adapters;
pub mod capture;
pub mod cassette;
pub mod checklist;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod ports;
pub mod store;
pub mod trigger;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> std::result::Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli.command)
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run(["glimpse", "unknown"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_errors_on_missing_task_argument() {
        let err = run(["glimpse", "verify"]).unwrap_err();
        assert!(err.contains("TASK"));
    }
}
