//! Configuration validation logic
//!
//! Each section checks its own values; [`Settings::validate`] returns the
//! first error encountered.

use crate::config::error::ConfigError;
use crate::config::settings::{
    BroadcastConfig, FileSettings, LoggerSettings, QueueConfig, RedisConfig, Settings,
};
use crate::logger::VALID_LOG_LEVELS;

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

const VALID_REDIS_SCHEMES: &[&str] = &["redis://", "rediss://", "redis+unix://", "unix://"];

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        self.file.validate()
    }
}

impl RedisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::validation(
                "redis.url",
                "Redis URL is required. Please specify a valid connection string.",
            ));
        }

        if !VALID_REDIS_SCHEMES
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(ConfigError::ValidationError {
                field: "redis.url".to_string(),
                message: format!(
                    "Invalid redis URL '{}'. Expected one of the schemes: {}",
                    self.url,
                    VALID_REDIS_SCHEMES.join(", ")
                ),
            });
        }

        if self.pool_size == 0 {
            return Err(ConfigError::validation(
                "redis.pool_size",
                "Pool size must be greater than 0.",
            ));
        }

        if self.connection_timeout == 0 {
            return Err(ConfigError::validation(
                "redis.connection_timeout",
                "Connection timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl QueueConfig {
    /// Validate queue settings
    ///
    /// # Validation Rules
    /// - Key must not be empty
    /// - Block timeout must be at least 1 second (a zero BRPOP timeout blocks forever)
    /// - Promote batch size must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key.trim().is_empty() {
            return Err(ConfigError::validation(
                "queue.key",
                "Queue key must not be empty.",
            ));
        }

        if self.block_timeout_seconds == 0 {
            return Err(ConfigError::validation(
                "queue.block_timeout_seconds",
                "Block timeout must be at least 1 second.",
            ));
        }

        if self.promote_batch_size == 0 {
            return Err(ConfigError::validation(
                "queue.promote_batch_size",
                "Promote batch size must be greater than 0.",
            ));
        }

        Ok(())
    }
}

impl BroadcastConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.channel_prefix.trim().is_empty() {
            return Err(ConfigError::validation(
                "broadcast.channel_prefix",
                "Channel prefix is required when broadcasting is enabled.",
            ));
        }
        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// Redis settings are only checked when something actually connects.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logger.validate()?;
        self.queue.validate()?;
        self.broadcast.validate()?;
        if self.needs_redis() {
            self.redis.validate()?;
        }
        Ok(())
    }
}
