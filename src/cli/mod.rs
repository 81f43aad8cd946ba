//! CLI module for courier-rs
//!
//! - Argument parsing with clap
//! - Configuration merging (CLI args + config files)
//! - Command execution

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Cli, Commands, Environment, LogLevel};

use anyhow::Context;
use clap::Parser;

use crate::config::settings::Settings;
use crate::logger::init_logger;
use crate::notifications::NotificationTypeProvider;

/// Parse arguments, load configuration, start logging and run the command.
///
/// `provider` registers the host's notification types so queued jobs can be
/// rebuilt by the worker.
pub async fn run(provider: &dyn NotificationTypeProvider) -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_and_merge_config(&cli)?;
    init_logger_from_settings(&settings)?;

    tracing::info!(
        name = %settings.application.name,
        version = %settings.application.version,
        "Starting"
    );

    execute_command(&cli, settings, provider)
        .await
        .context("Command failed")
}

/// Load configuration files and apply CLI overrides
pub fn load_and_merge_config(cli: &Cli) -> anyhow::Result<Settings> {
    let merger = ConfigurationMerger::from_cli(cli).context("Configuration error")?;
    merger
        .merge_cli_args(cli)
        .context("Configuration merge error")
}

pub fn init_logger_from_settings(settings: &Settings) -> anyhow::Result<()> {
    let logger_config = settings
        .logger
        .clone()
        .into_logger_config()
        .context("Logger configuration error")?;

    init_logger(logger_config).context("Logger initialization error")
}
