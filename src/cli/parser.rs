//! CLI argument parsing with clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::build;

/// Notification dispatch and queue worker
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(about = "Notification dispatch and queued delivery worker")]
#[command(long_about = "
Courier delivers notifications over mail, database and broadcast channels and
runs the worker that drains the notification queue, promoting delayed jobs
when they fall due.

EXAMPLES:
    # Run the worker with the layered configuration in ./config
    courier work

    # Use a single configuration file
    courier --config /etc/courier/production.toml work

    # Block at most 2 seconds per dequeue, with debug logging
    courier --verbose work --block-timeout 2

    # Check configuration without connecting to anything
    courier work --dry-run
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute (defaults to `work`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Load this single TOML file instead of the layered `config/` directory.
    /// `COURIER_*` environment variables still override it.
    #[arg(short, long, value_name = "FILE", global = true, value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `{environment}.toml` layer is loaded. Takes precedence
    /// over `COURIER_APP_ENV`.
    #[arg(short, long, value_enum, global = true)]
    pub env: Option<Environment>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the queue worker until Ctrl+C or SIGTERM (default)
    ///
    /// Each iteration promotes due delayed jobs, then waits up to the block
    /// timeout for the next job. On shutdown the job in flight finishes first.
    Work {
        /// Seconds to wait for a job before checking for shutdown again
        ///
        /// Default: queue.block_timeout_seconds (5)
        #[arg(short = 't', long, value_name = "SECONDS", value_parser = super::validation::validate_block_timeout)]
        block_timeout: Option<u64>,

        /// Log level override for this run
        ///
        /// Takes precedence over the global --verbose/--quiet flags.
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration and exit
        #[arg(long)]
        dry_run: bool,
    },
}

impl Commands {
    pub fn default_work() -> Self {
        Commands::Work {
            block_timeout: None,
            log_level: None,
            dry_run: false,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Cli {
    /// The command to run, `work` when none was given
    pub fn resolved_command(&self) -> Commands {
        self.command.clone().unwrap_or_else(Commands::default_work)
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        <Cli as CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_defaults_to_work() {
        let cli = Cli::try_parse_from(["courier"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.resolved_command(), Commands::default_work());
    }

    #[test]
    fn test_work_arguments() {
        let cli = Cli::try_parse_from([
            "courier",
            "work",
            "-t",
            "2",
            "--log-level",
            "trace",
            "--env",
            "prod",
            "--verbose",
        ])
        .unwrap();

        assert_eq!(
            cli.resolved_command(),
            Commands::Work {
                block_timeout: Some(2),
                log_level: Some(LogLevel::Trace),
                dry_run: false,
            }
        );
        assert_eq!(cli.env, Some(Environment::Production));
        assert!(cli.verbose);
    }

    #[test]
    fn test_zero_block_timeout_rejected() {
        assert!(Cli::try_parse_from(["courier", "work", "--block-timeout", "0"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["courier", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_missing_config_file_rejected() {
        assert!(Cli::try_parse_from(["courier", "--config", "/does/not/exist.toml"]).is_err());
    }

    #[test]
    fn test_environment_conversion() {
        let env: crate::config::Environment = Environment::Staging.into();
        assert_eq!(env, crate::config::Environment::Staging);
    }
}
