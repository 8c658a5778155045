//! Task lifecycle and dependency store for coding-agent workflows.
//!
//! Tasks live in a single JSON document under the store directory. They
//! move `PENDING -> IN_PROGRESS -> COMPLETED`, where completion is gated on
//! a verification score. Around that core sit a consistency auditor,
//! archive snapshots, soft delete with recovery, and an append-only history.
//!
//! [`service::TaskService`] is the entry point for library callers; the
//! `taskledger` binary is a thin CLI over it.

pub mod adapters;
pub mod archive;
pub mod audit;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod model;
pub mod ports;
pub mod recovery;
pub mod service;
pub mod store;

use clap::Parser;

pub use error::{Error, Result};
pub use service::TaskService;

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
        let result = run(["taskledger", "unknown"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_errors_on_missing_required_argument() {
        let result = run(["taskledger", "start"]);
        assert!(result.is_err());
    }
}
