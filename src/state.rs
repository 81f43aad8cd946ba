//! Application state wired from [`Settings`].
//!
//! Builds the type registry, the queue backend selected in configuration, the
//! queue adapter, the default channel set and the worker on top of them.

use std::sync::Arc;

use crate::config::settings::{QueueBackendKind, Settings};
use crate::error::AppResult;
use crate::notifications::{
    BroadcastChannel, Channel, DatabaseChannel, MailChannel, NotificationManager,
    NotificationSerializer, NotificationTypeProvider, NotificationWorker, RedisBroadcastAdapter,
    TypeRegistry,
};
use crate::queue::{self, MemoryQueueBackend, QueueAdapter, QueueBackend, RedisQueueBackend};

/// Shared engine components.
///
/// Cloning is cheap; every component is reference counted.
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: TypeRegistry,
    pub queue: Arc<QueueAdapter>,
    pub manager: NotificationManager,
}

impl AppState {
    /// Build the engine described by `settings`.
    ///
    /// Mail and database channels start without adapters and skip delivery
    /// until a host replaces them through [`AppState::with_channel`].
    pub async fn from_settings(
        settings: Settings,
        provider: &dyn NotificationTypeProvider,
    ) -> AppResult<Self> {
        settings.validate()?;

        let registry = TypeRegistry::new();
        provider.register_types(&registry);
        tracing::info!(types = ?registry.list_types(), "Registered notification types");

        let redis = if settings.needs_redis() {
            let connection = queue::redis::connect(&settings.redis).await?;
            tracing::info!(url = %settings.redis.url, pool_size = settings.redis.pool_size, "Connected to redis");
            Some(connection)
        } else {
            None
        };

        let backend: Arc<dyn QueueBackend> = match (settings.queue.backend, &redis) {
            (QueueBackendKind::Redis, Some((client, pool))) => Arc::new(RedisQueueBackend::new(
                client.clone(),
                pool.clone(),
                settings.queue.key.clone(),
            )),
            _ => Arc::new(MemoryQueueBackend::new(settings.queue.key.clone())),
        };

        let queue = Arc::new(
            QueueAdapter::new(backend)
                .with_serializer(NotificationSerializer::new(registry.clone()))
                .with_promote_batch_size(settings.queue.promote_batch_size),
        );

        let mut manager = NotificationManager::new()
            .with_channel(Arc::new(MailChannel::default()))
            .with_channel(Arc::new(DatabaseChannel::default()))
            .with_queue(queue.clone());

        if settings.broadcast.enabled
            && let Some((_, pool)) = &redis
        {
            let adapter = RedisBroadcastAdapter::new(
                pool.clone(),
                settings.broadcast.channel_prefix.clone(),
            );
            manager = manager.with_channel(Arc::new(BroadcastChannel::new(Arc::new(adapter))));
        }

        tracing::info!(
            backend = settings.queue.backend.as_str(),
            queue = %settings.queue.key,
            channels = ?manager.channel_names(),
            "Notification engine ready"
        );

        Ok(Self {
            settings: Arc::new(settings),
            registry,
            queue,
            manager,
        })
    }

    /// Replace or add a delivery channel
    pub fn with_channel(mut self, channel: Arc<dyn Channel>) -> Self {
        self.manager = self.manager.with_channel(channel);
        self
    }

    pub fn worker(&self) -> NotificationWorker {
        NotificationWorker::new(self.queue.clone(), self.manager.clone())
    }
}
