//! Core notification trait.
//!
//! A notification describes *what* to send. Channel support is expressed as
//! optional capabilities: every `to_*` method defaults to `None`, and a channel
//! whose capability returns `None` silently skips the notification.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::message::{DatabaseRecord, MailMessage};
use super::recipient::Recipient;
use crate::error::AppError;

/// Delay used by the default backoff when a notification declares none
pub const DEFAULT_DELAY_SECONDS: f64 = 5.0;

/// Exposes a notification's own fields as plain JSON data.
///
/// Implemented for every `Serialize` type, so notification structs only need
/// `#[derive(Serialize)]`.
pub trait NotificationData {
    fn to_data(&self) -> serde_json::Result<Value>;
}

impl<T: Serialize> NotificationData for T {
    fn to_data(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Trait implemented by every user-defined notification type.
///
/// # Example Implementation
/// ```ignore
/// #[derive(Debug, Serialize, Deserialize)]
/// pub struct InvoicePaid {
///     pub invoice_id: String,
/// }
///
/// impl Notification for InvoicePaid {
///     fn type_tag(&self) -> Option<&str> {
///         Some("invoice.paid")
///     }
///
///     fn channels(&self, _recipient: &Recipient) -> Vec<String> {
///         vec!["mail".to_string(), "database".to_string()]
///     }
///
///     fn to_mail(&self, _recipient: &Recipient) -> Option<MailMessage> {
///         Some(MailMessage::new().subject("Invoice paid"))
///     }
/// }
/// ```
pub trait Notification: NotificationData + Send + Sync + fmt::Debug {
    /// Channel names this notification should go out on, matched
    /// case-insensitively against the configured channels
    fn channels(&self, recipient: &Recipient) -> Vec<String>;

    /// Explicit, stable type tag used on the wire
    fn type_tag(&self) -> Option<&str> {
        None
    }

    /// Fallback type name when no tag is set: the unqualified Rust type name
    fn type_name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn to_mail(&self, _recipient: &Recipient) -> Option<MailMessage> {
        None
    }

    fn to_database(&self, _recipient: &Recipient) -> Option<DatabaseRecord> {
        None
    }

    fn to_broadcast(&self, _recipient: &Recipient) -> Option<Value> {
        None
    }

    /// Broadcast channel names, published to in order
    fn broadcast_on(&self, _recipient: &Recipient) -> Vec<String> {
        Vec::new()
    }

    /// Whether delivery should go through the queue instead of happening inline
    fn should_queue(&self) -> bool {
        false
    }

    /// Number of re-enqueues allowed after failures; 0 disables retry
    fn retry_limit(&self) -> u32 {
        0
    }

    /// Base delay in seconds for deferred delivery and for the default backoff
    fn delay_seconds(&self) -> Option<f64> {
        None
    }

    fn should_retry(&self, _error: &AppError, _attempt: u32) -> bool {
        true
    }

    /// Custom backoff in seconds for the given (next) attempt; `None` selects
    /// the default exponential policy
    fn backoff(&self, _attempt: u32, _error: &AppError) -> Option<f64> {
        None
    }
}

/// Resolves the wire type of a notification: its tag, else its type name.
/// Returns `None` when neither is usable.
pub fn resolve_type_name(notification: &dyn Notification) -> Option<String> {
    notification
        .type_tag()
        .filter(|tag| !tag.trim().is_empty())
        .or_else(|| Some(notification.type_name()).filter(|name| !name.trim().is_empty()))
        .map(str::to_string)
}

/// Strips module paths (including those inside generic arguments)
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
