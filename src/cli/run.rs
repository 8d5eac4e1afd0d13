//! Command dispatcher: wires the collaborators together and runs the
//! requested command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use super::args::{Arguments, Command, RunCommand};
use super::exit_status::ExitStatus;
use crate::config::{CONFIG_FILE_NAME, Config, default_config_json};
use crate::engine::{DirPayload, Engine, RunSummary};
use crate::fetcher::NoDownloader;
use crate::hints::HintRegistry;
use crate::report::SimpleEngine;
use crate::store::JsonStore;
use crate::utils;

/// Success mark for consistent output formatting
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓
/// Failure mark for consistent output formatting
pub const FAILURE_MARK: &str = "\u{2718}"; // ✘

pub fn run(Arguments { command }: Arguments) -> Result<ExitStatus> {
    match command {
        Some(Command::Run(cmd)) => process(cmd),
        Some(Command::Init) => init(),
        None => {
            anyhow::bail!("No command provided. Use --help to see available commands.")
        }
    }
}

fn process(cmd: RunCommand) -> Result<ExitStatus> {
    let config_path = cmd.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let conf = Config::load(&config_path)?;
    if cmd.verbose {
        println!(
            "Using {} ({} suites, workspace {})",
            config_path.display(),
            conf.suites.len(),
            conf.workspace_dir.display()
        );
    }

    if conf.archive_root.starts_with("http://") || conf.archive_root.starts_with("https://") {
        utils::warn("remote archive roots need a download transport; none is configured");
    }

    let store = JsonStore::open(&conf.db_dir())?;
    let registry = HintRegistry::load_default()?;
    let template_engine = SimpleEngine;
    let payload = DirPayload::new(&conf.payload_root());

    let engine = Engine::new(
        &conf,
        &store,
        &registry,
        &template_engine,
        &payload,
        Box::new(NoDownloader),
        None,
    )?;
    let summary = engine.run(cmd.suite.as_deref(), cmd.force)?;
    print_summary(&summary);

    Ok(if summary.total_errors > 0 {
        ExitStatus::Failure
    } else {
        ExitStatus::Success
    })
}

fn print_summary(summary: &RunSummary) {
    let counts = format!(
        "Processed {} packages in {} slices ({} skipped): {} errors, {} warnings, {} infos",
        summary.packages_processed,
        summary.slices_processed,
        summary.slices_skipped,
        summary.total_errors,
        summary.total_warnings,
        summary.total_infos,
    );
    if summary.total_errors > 0 {
        println!("{} {}", FAILURE_MARK.red(), counts.red());
    } else {
        println!("{} {}", SUCCESS_MARK.green(), counts.green());
    }
}

fn init() -> Result<ExitStatus> {
    let path = Path::new(CONFIG_FILE_NAME);
    if path.exists() {
        utils::warn(&format!("{CONFIG_FILE_NAME} already exists, leaving it alone"));
        return Ok(ExitStatus::Success);
    }

    fs::write(path, default_config_json())
        .with_context(|| format!("failed to write {CONFIG_FILE_NAME}"))?;
    fs::create_dir_all("./workspace").context("failed to create the workspace directory")?;
    println!(
        "{} {}",
        SUCCESS_MARK.green(),
        format!("Created {CONFIG_FILE_NAME}").green()
    );
    Ok(ExitStatus::Success)
}
