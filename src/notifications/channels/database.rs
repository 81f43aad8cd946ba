use std::sync::Arc;

use async_trait::async_trait;

use super::Channel;
use crate::error::{AppError, AppResult};
use crate::notifications::adapters::DatabaseAdapter;
use crate::notifications::{Notification, Recipient};

pub const DATABASE_CHANNEL: &str = "database";

/// Persists `to_database` records.
#[derive(Default, Clone)]
pub struct DatabaseChannel {
    adapter: Option<Arc<dyn DatabaseAdapter>>,
}

impl DatabaseChannel {
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self {
            adapter: Some(adapter),
        }
    }
}

#[async_trait]
impl Channel for DatabaseChannel {
    fn name(&self) -> &str {
        DATABASE_CHANNEL
    }

    async fn send(&self, notification: &dyn Notification, recipient: &Recipient) -> AppResult<()> {
        let (Some(adapter), Some(record)) = (&self.adapter, notification.to_database(recipient))
        else {
            return Ok(());
        };

        adapter
            .save(&record)
            .await
            .map_err(|e| AppError::transport(DATABASE_CHANNEL, e))
    }
}
