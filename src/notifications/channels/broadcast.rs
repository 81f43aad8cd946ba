use std::sync::Arc;

use async_trait::async_trait;

use super::Channel;
use crate::error::{AppError, AppResult};
use crate::notifications::adapters::BroadcastAdapter;
use crate::notifications::{Notification, Recipient};

pub const BROADCAST_CHANNEL: &str = "broadcast";

/// Publishes `to_broadcast` payloads to each `broadcast_on` channel, one
/// after another in the order given. Stops at the first failing publish.
#[derive(Default, Clone)]
pub struct BroadcastChannel {
    adapter: Option<Arc<dyn BroadcastAdapter>>,
}

impl BroadcastChannel {
    pub fn new(adapter: Arc<dyn BroadcastAdapter>) -> Self {
        Self {
            adapter: Some(adapter),
        }
    }
}

#[async_trait]
impl Channel for BroadcastChannel {
    fn name(&self) -> &str {
        BROADCAST_CHANNEL
    }

    async fn send(&self, notification: &dyn Notification, recipient: &Recipient) -> AppResult<()> {
        let Some(adapter) = &self.adapter else {
            return Ok(());
        };
        let Some(payload) = notification.to_broadcast(recipient) else {
            return Ok(());
        };

        for target in notification.broadcast_on(recipient) {
            adapter
                .publish(&target, &payload)
                .await
                .map_err(|e| AppError::transport(BROADCAST_CHANNEL, e))?;
        }

        Ok(())
    }
}
