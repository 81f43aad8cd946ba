//! Delivery channels.
//!
//! A channel turns a notification into one external side effect through an
//! injected adapter. Every channel is no-op safe: a missing capability on the
//! notification or a missing adapter makes `send` return `Ok(())` silently.

pub mod broadcast;
pub mod database;
pub mod mail;

pub use broadcast::BroadcastChannel;
pub use database::DatabaseChannel;
pub use mail::MailChannel;

use async_trait::async_trait;

use super::notification::Notification;
use super::recipient::Recipient;
use crate::error::AppResult;

/// A named delivery mechanism.
///
/// Names are compared case-insensitively against the names a notification
/// returns from `channels()`.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, notification: &dyn Notification, recipient: &Recipient) -> AppResult<()>;
}
