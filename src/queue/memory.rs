//! In-process queue backend.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::queue::{QueueBackend, QueueError};

#[derive(Default)]
struct MemoryState {
    /// Pushed at the front, popped from the back
    queue: VecDeque<String>,
    /// Keyed by (due_at_ms, insertion sequence) so equal due times keep order
    delayed: BTreeMap<(i64, u64), String>,
    seq: u64,
}

/// Queue held in process memory.
///
/// Both structures sit behind one mutex, so promotion is trivially atomic.
/// Blocking pops wait on a [`Notify`] and also wake up when the stop token is
/// cancelled. Jobs do not survive a restart.
pub struct MemoryQueueBackend {
    key: String,
    state: Mutex<MemoryState>,
    notify: Notify,
}

impl MemoryQueueBackend {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: Mutex::new(MemoryState::default()),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, QueueError> {
        self.state
            .lock()
            .map_err(|e| QueueError::Operation(e.to_string()))
    }

    fn try_pop(&self) -> Result<Option<String>, QueueError> {
        Ok(self.lock()?.queue.pop_back())
    }
}

#[async_trait]
impl QueueBackend for MemoryQueueBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn queue_key(&self) -> &str {
        &self.key
    }

    async fn push(&self, payload: String) -> Result<(), QueueError> {
        self.lock()?.queue.push_front(payload);
        self.notify.notify_one();
        Ok(())
    }

    async fn schedule(&self, due_at_ms: i64, payload: String) -> Result<(), QueueError> {
        let mut state = self.lock()?;
        let seq = state.seq;
        state.seq += 1;
        state.delayed.insert((due_at_ms, seq), payload);
        Ok(())
    }

    async fn pop(
        &self,
        timeout: Duration,
        stop: Option<&CancellationToken>,
    ) -> Result<Option<String>, QueueError> {
        let deadline = Instant::now() + timeout;

        loop {
            // Register interest before checking so a push in between is not missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(payload) = self.try_pop()? {
                return Ok(Some(payload));
            }

            let stopped = async {
                match stop {
                    Some(token) => token.cancelled().await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = &mut notified => continue,
                _ = tokio::time::sleep_until(deadline) => return self.try_pop(),
                _ = stopped => return Ok(None),
            }
        }
    }

    async fn promote_due(&self, now_ms: i64, batch_size: usize) -> Result<usize, QueueError> {
        let mut state = self.lock()?;

        let due: Vec<(i64, u64)> = state
            .delayed
            .range(..=(now_ms, u64::MAX))
            .take(batch_size)
            .map(|(key, _)| *key)
            .collect();

        if due.is_empty() {
            return Ok(0);
        }

        for key in &due {
            if let Some(payload) = state.delayed.remove(key) {
                state.queue.push_front(payload);
            }
        }
        drop(state);

        for _ in 0..due.len() {
            self.notify.notify_one();
        }

        Ok(due.len())
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.lock()?.queue.len())
    }

    async fn delayed_len(&self) -> Result<usize, QueueError> {
        Ok(self.lock()?.delayed.len())
    }
}
