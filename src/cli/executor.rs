//! Command executor for dispatching CLI commands

use super::handlers::WorkCommandHandler;
use super::parser::{Cli, Commands};
use crate::config::settings::Settings;
use crate::error::AppResult;
use crate::notifications::NotificationTypeProvider;

/// Execute the parsed command with merged settings
pub async fn execute_command(
    cli: &Cli,
    settings: Settings,
    provider: &dyn NotificationTypeProvider,
) -> AppResult<()> {
    match cli.resolved_command() {
        Commands::Work { dry_run, .. } => {
            WorkCommandHandler::new(settings)
                .execute(provider, dry_run)
                .await
        }
    }
}
