//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `run`: process configured suites and generate reports
//! - `init`: write a default configuration file

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process configured suites and generate metadata reports
    Run(RunCommand),
    /// Initialize an asgen configuration file
    Init,
}

#[derive(Debug, Clone, Args)]
pub struct RunCommand {
    /// Path to the configuration file
    #[arg(long, env = "ASGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only process the named suite
    #[arg(long)]
    pub suite: Option<String>,

    /// Reprocess slices even when their indices are unchanged
    #[arg(long)]
    pub force: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
