//! Notification dispatch.
//!
//! This module provides the notification model and everything needed to
//! deliver it: the type registry and serializer used to carry notifications
//! through the queue, the delivery channels with their adapters, the
//! dispatcher with its retry policy and the queue worker service.

pub mod adapters;
pub mod channels;
pub mod manager;
pub mod message;
pub mod notification;
pub mod recipient;
pub mod registry;
pub mod retry;
pub mod serializer;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use adapters::{
    BroadcastAdapter, DatabaseAdapter, MailAdapter, MailRenderer, RedisBroadcastAdapter,
};
pub use channels::{BroadcastChannel, Channel, DatabaseChannel, MailChannel};
pub use manager::{NotificationManager, SendOptions};
pub use message::{DatabaseRecord, MailMessage};
pub use notification::{DEFAULT_DELAY_SECONDS, Notification, NotificationData, resolve_type_name};
pub use recipient::{Recipient, RecipientId};
pub use registry::{NoNotificationTypes, NotificationFactory, NotificationTypeProvider, TypeRegistry};
pub use retry::RetryDecision;
pub use serializer::NotificationSerializer;
pub use worker::{NotificationWorker, RawNotification};
