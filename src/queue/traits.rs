//! QueueBackend trait definition.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::queue::QueueError;

/// Durable storage for pending jobs.
///
/// A backend owns two structures: an immediate FIFO list (push at one end,
/// pop at the other) and a delayed set ordered by due time in epoch
/// milliseconds. Payloads are opaque JSON strings.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Name of the immediate queue
    fn queue_key(&self) -> &str;

    /// Push a payload onto the immediate queue.
    async fn push(&self, payload: String) -> Result<(), QueueError>;

    /// Store a payload in the delayed set, due at `due_at_ms`.
    async fn schedule(&self, due_at_ms: i64, payload: String) -> Result<(), QueueError>;

    /// Pop the oldest payload from the immediate queue, waiting at most
    /// `timeout`. Backends that can interrupt the wait return early with
    /// `None` once `stop` is cancelled; the rest finish the bounded wait.
    async fn pop(
        &self,
        timeout: Duration,
        stop: Option<&CancellationToken>,
    ) -> Result<Option<String>, QueueError>;

    /// Atomically move up to `batch_size` delayed payloads due at or before
    /// `now_ms` onto the immediate queue, earliest first. An entry moved by
    /// one caller is never moved again by a concurrent caller.
    async fn promote_due(&self, now_ms: i64, batch_size: usize) -> Result<usize, QueueError>;

    /// Number of payloads waiting in the immediate queue.
    async fn len(&self) -> Result<usize, QueueError>;

    /// Number of payloads waiting in the delayed set.
    async fn delayed_len(&self) -> Result<usize, QueueError>;
}
