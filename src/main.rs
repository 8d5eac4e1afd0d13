//! asgen CLI application entry point.
//!
//! This binary handles command dispatch for the AppStream metadata
//! generator.

use std::process::ExitCode;

use asgen::cli::{Arguments, ExitStatus};
use clap::Parser;

fn main() -> ExitCode {
    let args = Arguments::parse();

    match asgen::cli::run_cli(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitStatus::Error.into()
        }
    }
}
