use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::error::{AppError, AppResult};
use crate::notifications::message::{DatabaseRecord, MailMessage};
use crate::notifications::notification::{Notification, NotificationData};
use crate::notifications::recipient::Recipient;

/// Rebuilds a notification instance from its plain data fields
pub type NotificationFactory =
    Arc<dyn Fn(JsonValue) -> AppResult<Box<dyn Notification>> + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    order: Vec<String>,
    factories: HashMap<String, NotificationFactory>,
}

/// Registry mapping notification type names to constructors.
///
/// Cloning is cheap and clones share the same mapping, so one registry is
/// created at startup and handed to every serializer that needs it.
/// Re-registering a name replaces its constructor but keeps its original
/// position in `list_types`.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under the given type name (last write wins)
    pub fn register(&self, type_name: impl Into<String>, factory: NotificationFactory) {
        let type_name = type_name.into();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.factories.insert(type_name.clone(), factory).is_none() {
            inner.order.push(type_name);
        }
    }

    /// Register a deserializable notification type under the given name
    pub fn register_type<T>(&self, type_name: impl Into<String>) -> &Self
    where
        T: Notification + DeserializeOwned + 'static,
    {
        let type_name = type_name.into();
        let context = type_name.clone();
        let factory: NotificationFactory = Arc::new(move |data: JsonValue| {
            let serialization_error = |e: serde_json::Error| AppError::Serialization {
                context: format!("hydrating {}", context),
                source: e,
            };
            let notification: T =
                serde_json::from_value(data.clone()).map_err(serialization_error)?;

            let declared = notification.to_data().map_err(serialization_error)?;
            let extra = unknown_fields(data, &declared);
            if extra.is_empty() {
                return Ok(Box::new(notification) as Box<dyn Notification>);
            }
            Ok(Box::new(WithExtraFields {
                inner: notification,
                extra,
            }) as Box<dyn Notification>)
        });

        self.register(type_name, factory);
        self
    }

    pub fn resolve(&self, type_name: &str) -> Option<NotificationFactory> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.factories.get(type_name).cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.factories.contains_key(type_name)
    }

    /// Registered type names in insertion order
    pub fn list_types(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.order.clone()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.order.clear();
        inner.factories.clear();
    }
}

/// Top-level keys of `data` that the hydrated type does not write back
fn unknown_fields(data: JsonValue, declared: &JsonValue) -> Map<String, JsonValue> {
    let (JsonValue::Object(data), JsonValue::Object(declared)) = (data, declared) else {
        return Map::new();
    };
    data.into_iter()
        .filter(|(key, _)| !declared.contains_key(key))
        .collect()
}

/// Hydrated notification carrying payload fields its type does not declare,
/// so a re-queued job keeps them.
#[derive(Debug)]
struct WithExtraFields<T> {
    inner: T,
    extra: Map<String, JsonValue>,
}

impl<T: Notification> NotificationData for WithExtraFields<T> {
    fn to_data(&self) -> serde_json::Result<JsonValue> {
        let mut data = self.inner.to_data()?;
        if let JsonValue::Object(fields) = &mut data {
            for (key, value) in &self.extra {
                fields.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        Ok(data)
    }
}

impl<T: Notification> Notification for WithExtraFields<T> {
    fn channels(&self, recipient: &Recipient) -> Vec<String> {
        self.inner.channels(recipient)
    }

    fn type_tag(&self) -> Option<&str> {
        self.inner.type_tag()
    }

    fn type_name(&self) -> &str {
        self.inner.type_name()
    }

    fn to_mail(&self, recipient: &Recipient) -> Option<MailMessage> {
        self.inner.to_mail(recipient)
    }

    fn to_database(&self, recipient: &Recipient) -> Option<DatabaseRecord> {
        self.inner.to_database(recipient)
    }

    fn to_broadcast(&self, recipient: &Recipient) -> Option<JsonValue> {
        self.inner.to_broadcast(recipient)
    }

    fn broadcast_on(&self, recipient: &Recipient) -> Vec<String> {
        self.inner.broadcast_on(recipient)
    }

    fn should_queue(&self) -> bool {
        self.inner.should_queue()
    }

    fn retry_limit(&self) -> u32 {
        self.inner.retry_limit()
    }

    fn delay_seconds(&self) -> Option<f64> {
        self.inner.delay_seconds()
    }

    fn should_retry(&self, error: &AppError, attempt: u32) -> bool {
        self.inner.should_retry(error, attempt)
    }

    fn backoff(&self, attempt: u32, error: &AppError) -> Option<f64> {
        self.inner.backoff(attempt, error)
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.list_types())
            .finish()
    }
}

/// Source of notification types for a host application.
///
/// How types are found (explicit lists, build-time generated tables, ...) is up
/// to the host; the engine only sees the resulting registrations.
pub trait NotificationTypeProvider: Send + Sync {
    fn register_types(&self, registry: &TypeRegistry);
}

/// Provider that registers nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNotificationTypes;

impl NotificationTypeProvider for NoNotificationTypes {
    fn register_types(&self, _registry: &TypeRegistry) {}
}
