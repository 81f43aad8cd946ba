//! Configuration merger for CLI arguments and config files
//!
//! CLI arguments override values loaded from files and `COURIER_*` variables.

use super::parser::{Cli, Commands};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, settings::Settings};

/// Applies CLI overrides on top of file-based configuration.
#[derive(Debug)]
pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Load the base configuration the way the CLI asks for it.
    ///
    /// `--config` switches to single file mode and `--env` replaces the
    /// environment read from `COURIER_APP_ENV`.
    ///
    /// # Errors
    /// Returns ConfigError if configuration loading or validation fails
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut loader = match &cli.config {
            Some(path) => ConfigLoader::from_file(path)?,
            None => ConfigLoader::new()?,
        };

        if let Some(env) = cli.env {
            loader = loader.with_environment(env.into());
        }

        tracing::debug!(
            environment = %loader.environment(),
            config_dir = %loader.config_dir().display(),
            config_file = ?loader.config_file(),
            "Loading configuration"
        );

        Ok(Self::new(loader.load()?))
    }

    /// Merge CLI arguments with the base configuration and validate the result
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        Self::apply_global_overrides(&mut config, cli);
        Self::apply_command_overrides(&mut config, &cli.resolved_command());

        config.validate()?;

        Ok(config)
    }

    fn apply_global_overrides(config: &mut Settings, cli: &Cli) {
        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }
    }

    fn apply_command_overrides(config: &mut Settings, command: &Commands) {
        match command {
            Commands::Work {
                block_timeout,
                log_level,
                dry_run: _,
            } => {
                if let Some(seconds) = block_timeout {
                    config.queue.block_timeout_seconds = *seconds;
                }

                // command-level log level beats --verbose/--quiet
                if let Some(level) = log_level {
                    config.logger.level = level.as_str().to_string();
                }
            }
        }
    }

    pub fn config(&self) -> &Settings {
        &self.base_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    fn merge(args: &[&str]) -> Settings {
        let cli = Cli::try_parse_from(args).expect("valid arguments");
        ConfigurationMerger::new(Settings::default())
            .merge_cli_args(&cli)
            .expect("merge should succeed")
    }

    #[test]
    fn test_no_overrides_keeps_base() {
        let merged = merge(&["courier"]);
        assert_eq!(merged, Settings::default());
    }

    #[test]
    fn test_verbose_and_quiet_flags() {
        assert_eq!(merge(&["courier", "--verbose"]).logger.level, "debug");
        assert_eq!(merge(&["courier", "work", "--quiet"]).logger.level, "error");
    }

    #[test]
    fn test_command_log_level_beats_global_flag() {
        let merged = merge(&["courier", "-v", "work", "--log-level", "warn"]);
        assert_eq!(merged.logger.level, "warn");
    }

    #[test]
    fn test_block_timeout_override() {
        let merged = merge(&["courier", "work", "--block-timeout", "2"]);
        assert_eq!(merged.queue.block_timeout(), Duration::from_secs(2));
        assert_eq!(merged.queue.key, Settings::default().queue.key);
    }

    #[test]
    fn test_merge_revalidates() {
        let mut base = Settings::default();
        base.queue.key = String::new();
        let cli = Cli::try_parse_from(["courier"]).unwrap();

        let result = ConfigurationMerger::new(base).merge_cli_args(&cli);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }
}
