//! Work command handler
//!
//! Builds the engine from settings and runs the queue worker until a
//! shutdown signal arrives.

use crate::config::settings::Settings;
use crate::error::AppResult;
use crate::notifications::NotificationTypeProvider;
use crate::state::AppState;

pub struct WorkCommandHandler {
    config: Settings,
}

impl WorkCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Run the worker, or only check the configuration when `dry_run` is set
    pub async fn execute(
        &self,
        provider: &dyn NotificationTypeProvider,
        dry_run: bool,
    ) -> AppResult<()> {
        if dry_run {
            return self.validate_only();
        }

        let state = AppState::from_settings(self.config.clone(), provider).await?;
        self.run(state).await
    }

    /// Run the worker on an already built engine
    pub async fn run(&self, state: AppState) -> AppResult<()> {
        let block_timeout = self.config.queue.block_timeout();
        let result = state.worker().start(block_timeout).await;

        let backend = state.queue.backend();
        match (backend.len().await, backend.delayed_len().await) {
            (Ok(pending), Ok(delayed)) => {
                tracing::info!(pending, delayed, "Jobs left in queue at shutdown")
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Could not read queue size at shutdown")
            }
        }

        result
    }

    /// Validate configuration without connecting to any backend
    pub fn validate_only(&self) -> AppResult<()> {
        self.config.validate()?;

        println!("✓ Configuration is valid");
        println!(
            "✓ Queue backend: {} (key '{}')",
            self.config.queue.backend.as_str(),
            self.config.queue.key
        );
        println!(
            "✓ Block timeout: {}s, promote batch size: {}",
            self.config.queue.block_timeout_seconds, self.config.queue.promote_batch_size
        );
        if self.config.needs_redis() {
            println!("✓ Redis URL: {}", self.config.redis.url);
        }
        if self.config.broadcast.enabled {
            println!(
                "✓ Broadcasting on '{}.*'",
                self.config.broadcast.channel_prefix
            );
        }
        println!("Dry run completed successfully");
        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}
