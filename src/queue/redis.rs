//! Redis queue backend using a bb8 connection pool.
//!
//! Layout: the immediate queue is a list at `<key>` (LPUSH / BRPOP) and the
//! delayed set is a sorted set at `<key>:delayed` scored by due time in epoch
//! milliseconds.

use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, AsyncConnectionConfig, Client, RedisError, Script};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::settings::RedisConfig;
use crate::queue::{QueueBackend, QueueError};

pub type RedisPool = Pool<Client>;

/// Moves due members to the list, but only those this call managed to ZREM.
/// A member removed by a concurrent promoter is skipped, never pushed twice.
const PROMOTE_SCRIPT: &str = r#"
local due = redis.call('ZRANGEBYSCORE', KEYS[2], '-inf', ARGV[1], 'LIMIT', 0, tonumber(ARGV[2]))
local moved = 0
for _, member in ipairs(due) do
  if redis.call('ZREM', KEYS[2], member) == 1 then
    redis.call('LPUSH', KEYS[1], member)
    moved = moved + 1
  end
end
return moved
"#;

/// Extra time granted on top of the BRPOP timeout before the client gives up
const BLOCKING_GRACE: Duration = Duration::from_secs(5);

/// Open a client and a connection pool for the given settings.
pub async fn connect(config: &RedisConfig) -> Result<(Client, RedisPool), QueueError> {
    let client =
        Client::open(config.url.as_str()).map_err(|e| QueueError::Connection(e.to_string()))?;

    let pool = Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(Duration::from_secs(config.connection_timeout))
        .build(client.clone())
        .await
        .map_err(|e| QueueError::Connection(e.to_string()))?;

    Ok((client, pool))
}

/// Redis-backed queue.
///
/// Short commands go through the pool. Blocking pops use a dedicated
/// multiplexed connection without a response timeout so a long BRPOP does not
/// stall or time out the commands of other pool users.
pub struct RedisQueueBackend {
    client: Client,
    pool: RedisPool,
    queue_key: String,
    delayed_key: String,
    promote: Script,
    blocking: Mutex<Option<MultiplexedConnection>>,
}

impl RedisQueueBackend {
    pub fn new(client: Client, pool: RedisPool, queue_key: impl Into<String>) -> Self {
        let queue_key = queue_key.into();
        let delayed_key = delayed_key_for(&queue_key);

        Self {
            client,
            pool,
            queue_key,
            delayed_key,
            promote: Script::new(PROMOTE_SCRIPT),
            blocking: Mutex::new(None),
        }
    }

    pub fn delayed_key(&self) -> &str {
        &self.delayed_key
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, QueueError> {
        self.pool
            .get()
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))
    }

    async fn blocking_conn(&self) -> Result<MultiplexedConnection, QueueError> {
        let mut slot = self.blocking.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let config = AsyncConnectionConfig::new().set_response_timeout(None);
        let conn = self
            .client
            .get_multiplexed_async_connection_with_config(&config)
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn reset_blocking_conn(&self) {
        self.blocking.lock().await.take();
    }
}

pub fn delayed_key_for(queue_key: &str) -> String {
    format!("{}:delayed", queue_key)
}

#[async_trait]
impl QueueBackend for RedisQueueBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn queue_key(&self) -> &str {
        &self.queue_key
    }

    async fn push(&self, payload: String) -> Result<(), QueueError> {
        let mut conn = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .lpush::<_, _, ()>(&self.queue_key, payload)
            .await
            .map_err(|e| QueueError::Operation(e.to_string()))
    }

    async fn schedule(&self, due_at_ms: i64, payload: String) -> Result<(), QueueError> {
        let mut conn = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .zadd::<_, _, _, ()>(&self.delayed_key, payload, due_at_ms)
            .await
            .map_err(|e| QueueError::Operation(e.to_string()))
    }

    /// BRPOP cannot be abandoned midway without risking a lost element, so
    /// `stop` is only checked before blocking. Shutdown waits at most one
    /// `timeout`.
    async fn pop(
        &self,
        timeout: Duration,
        stop: Option<&CancellationToken>,
    ) -> Result<Option<String>, QueueError> {
        if stop.is_some_and(|token| token.is_cancelled()) {
            return Ok(None);
        }

        if timeout.is_zero() {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            return conn_ref
                .rpop(&self.queue_key, None)
                .await
                .map_err(|e: RedisError| QueueError::Operation(e.to_string()));
        }

        let mut conn = self.blocking_conn().await?;
        let mut brpop = redis::cmd("BRPOP");
        brpop.arg(&self.queue_key).arg(timeout.as_secs_f64());
        let request = brpop.query_async::<Option<(String, String)>>(&mut conn);

        match tokio::time::timeout(timeout + BLOCKING_GRACE, request).await {
            Ok(Ok(popped)) => Ok(popped.map(|(_, payload)| payload)),
            Ok(Err(e)) => {
                self.reset_blocking_conn().await;
                Err(QueueError::Operation(e.to_string()))
            }
            Err(_) => {
                self.reset_blocking_conn().await;
                Err(QueueError::Connection(format!(
                    "BRPOP on {} did not answer within {:?}",
                    self.queue_key,
                    timeout + BLOCKING_GRACE
                )))
            }
        }
    }

    async fn promote_due(&self, now_ms: i64, batch_size: usize) -> Result<usize, QueueError> {
        let mut conn = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        self.promote
            .key(&self.queue_key)
            .key(&self.delayed_key)
            .arg(now_ms)
            .arg(batch_size)
            .invoke_async(conn_ref)
            .await
            .map_err(|e: RedisError| QueueError::Operation(e.to_string()))
    }

    async fn len(&self) -> Result<usize, QueueError> {
        let mut conn = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .llen(&self.queue_key)
            .await
            .map_err(|e: RedisError| QueueError::Operation(e.to_string()))
    }

    async fn delayed_len(&self) -> Result<usize, QueueError> {
        let mut conn = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .zcard(&self.delayed_key)
            .await
            .map_err(|e: RedisError| QueueError::Operation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delayed_key_suffix() {
        assert_eq!(
            delayed_key_for("notifications:queue"),
            "notifications:queue:delayed"
        );
    }

    #[test]
    fn test_promote_script_guards_push_with_zrem() {
        let zrem = PROMOTE_SCRIPT.find("ZREM").unwrap();
        let lpush = PROMOTE_SCRIPT.find("LPUSH").unwrap();
        assert!(zrem < lpush);
        assert!(PROMOTE_SCRIPT.contains("== 1"));
    }
}
