use std::sync::Arc;

use async_trait::async_trait;

use super::Channel;
use crate::error::{AppError, AppResult};
use crate::notifications::adapters::{MailAdapter, MailRenderer};
use crate::notifications::{Notification, Recipient};

pub const MAIL_CHANNEL: &str = "mail";

/// Sends `to_mail` drafts, optionally through a renderer first.
#[derive(Default, Clone)]
pub struct MailChannel {
    adapter: Option<Arc<dyn MailAdapter>>,
    renderer: Option<Arc<dyn MailRenderer>>,
}

impl MailChannel {
    pub fn new(adapter: Arc<dyn MailAdapter>) -> Self {
        Self {
            adapter: Some(adapter),
            renderer: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn MailRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }
}

#[async_trait]
impl Channel for MailChannel {
    fn name(&self) -> &str {
        MAIL_CHANNEL
    }

    async fn send(&self, notification: &dyn Notification, recipient: &Recipient) -> AppResult<()> {
        let Some(adapter) = &self.adapter else {
            return Ok(());
        };
        let Some(draft) = notification.to_mail(recipient) else {
            return Ok(());
        };

        let message = match &self.renderer {
            Some(renderer) => renderer
                .render(draft, recipient)
                .await
                .map_err(|e| AppError::transport(MAIL_CHANNEL, e))?,
            None => draft,
        };

        adapter
            .send_mail(&message, recipient)
            .await
            .map_err(|e| AppError::transport(MAIL_CHANNEL, e))?;

        tracing::debug!(recipient = %recipient.label(), "Mail sent");
        Ok(())
    }
}
