//! Converts live notifications to queue envelopes and back.

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::notifications::notification::{Notification, resolve_type_name};
use crate::notifications::recipient::Recipient;
use crate::notifications::registry::TypeRegistry;
use crate::queue::Envelope;

/// Notification serializer backed by a shared [`TypeRegistry`]
#[derive(Debug, Clone, Default)]
pub struct NotificationSerializer {
    registry: TypeRegistry,
}

impl NotificationSerializer {
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Registers the notification's concrete type so queued copies can be
    /// hydrated later. Returns the resolved type name.
    pub fn register<T>(&self, notification: &T) -> AppResult<String>
    where
        T: Notification + DeserializeOwned + 'static,
    {
        let type_name = resolve_type_name(notification).ok_or(AppError::MissingType {
            operation: "register",
        })?;

        self.registry.register_type::<T>(type_name.clone());
        tracing::debug!(notification_type = %type_name, "Registered notification type");
        Ok(type_name)
    }

    /// Builds an envelope stamped with the current time. Does not touch the
    /// registry.
    pub fn serialize(
        &self,
        notification: &dyn Notification,
        recipient: &Recipient,
    ) -> AppResult<Envelope> {
        let notification_type = resolve_type_name(notification).ok_or(AppError::MissingType {
            operation: "serialize",
        })?;

        let data = notification
            .to_data()
            .map_err(|e| AppError::Serialization {
                context: format!("serializing {}", notification_type),
                source: e,
            })?;

        Ok(Envelope {
            id: Uuid::new_v4(),
            notification_type,
            data,
            recipient: recipient.clone(),
            timestamp: jiff::Timestamp::now().as_millisecond(),
            attempt: 0,
        })
    }

    /// Reconstructs a notification instance from its type name and data
    pub fn hydrate(&self, type_name: &str, data: Value) -> AppResult<Box<dyn Notification>> {
        let factory = self
            .registry
            .resolve(type_name)
            .ok_or_else(|| AppError::UnknownType {
                type_name: type_name.to_string(),
            })?;

        factory(data)
    }
}
