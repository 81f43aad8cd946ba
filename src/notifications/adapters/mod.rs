//! Outbound adapter traits consumed by the channels.
//!
//! Adapters talk to the outside world (SMTP relay, database, pub/sub) and may
//! fail with arbitrary transport errors. Channels wrap those failures in
//! [`AppError::Transport`](crate::error::AppError) so the dispatcher can turn
//! them into retry decisions.

pub mod redis_broadcast;

pub use redis_broadcast::RedisBroadcastAdapter;

use async_trait::async_trait;
use serde_json::Value;

use super::message::{DatabaseRecord, MailMessage};
use super::recipient::Recipient;

/// Sends a fully rendered mail message.
///
/// # Example Implementation
/// ```ignore
/// pub struct SmtpMailer { transport: Transport }
///
/// #[async_trait]
/// impl MailAdapter for SmtpMailer {
///     async fn send_mail(&self, message: &MailMessage, recipient: &Recipient) -> anyhow::Result<()> {
///         self.transport.send(message.to.as_deref().or(recipient.email.as_deref()), message).await
///     }
/// }
/// ```
#[async_trait]
pub trait MailAdapter: Send + Sync {
    async fn send_mail(&self, message: &MailMessage, recipient: &Recipient) -> anyhow::Result<()>;
}

/// Turns a draft mail message into its final form (templating, layout, ...)
#[async_trait]
pub trait MailRenderer: Send + Sync {
    async fn render(&self, message: MailMessage, recipient: &Recipient)
    -> anyhow::Result<MailMessage>;
}

/// Persists notification records
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    async fn save(&self, record: &DatabaseRecord) -> anyhow::Result<()>;
}

/// Publishes a payload on a named real-time channel
#[async_trait]
pub trait BroadcastAdapter: Send + Sync {
    async fn publish(&self, channel: &str, payload: &Value) -> anyhow::Result<()>;
}
