//! Broadcast adapter publishing over Redis pub/sub.

use anyhow::Context;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use serde_json::Value;

use super::BroadcastAdapter;
use crate::queue::RedisPool;

/// Publishes JSON payloads to `<prefix>.<channel>`.
pub struct RedisBroadcastAdapter {
    pool: RedisPool,
    prefix: String,
}

impl RedisBroadcastAdapter {
    pub fn new(pool: RedisPool, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
        }
    }

    pub fn topic(&self, channel: &str) -> String {
        topic_name(&self.prefix, channel)
    }
}

fn topic_name(prefix: &str, channel: &str) -> String {
    format!("{}.{}", prefix, channel)
}

#[async_trait]
impl BroadcastAdapter for RedisBroadcastAdapter {
    async fn publish(&self, channel: &str, payload: &Value) -> anyhow::Result<()> {
        let topic = self.topic(channel);
        let message = serde_json::to_string(payload).context("encoding broadcast payload")?;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| anyhow::anyhow!("redis pool: {}", e))?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let receivers: i64 = conn_ref
            .publish(&topic, message)
            .await
            .with_context(|| format!("publishing to {}", topic))?;

        tracing::debug!(topic = %topic, receivers, "Published broadcast");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_name() {
        assert_eq!(topic_name("notifications", "user.7"), "notifications.user.7");
    }
}
