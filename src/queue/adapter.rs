//! Queue adapter: envelope encoding, delayed scheduling, promotion and the
//! blocking work loop on top of a [`QueueBackend`].

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::notifications::{Notification, NotificationSerializer, Recipient};
use crate::queue::{Clock, Envelope, QueueBackend, SystemClock};

pub const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PROMOTE_BATCH_SIZE: usize = 100;

/// Pause after a failed dequeue before polling the backend again
const BACKEND_ERROR_PAUSE: Duration = Duration::from_secs(1);

pub type JobHook = Arc<dyn Fn(&Envelope) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&AppError, &Envelope) + Send + Sync>;

/// Options for a single enqueue.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnqueueOptions {
    /// Attempt number stored in the envelope
    pub attempt: u32,
    /// Overrides the notification's own delay
    pub delay_seconds: Option<f64>,
    /// Force the delayed path even when the effective delay is zero
    pub delayed: bool,
}

impl EnqueueOptions {
    /// Options for a retry: always scheduled through the delayed set.
    pub fn retry(attempt: u32, delay_seconds: f64) -> Self {
        Self {
            attempt,
            delay_seconds: Some(delay_seconds),
            delayed: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DequeueConfig {
    pub block_timeout: Duration,
}

impl Default for DequeueConfig {
    fn default() -> Self {
        Self {
            block_timeout: DEFAULT_BLOCK_TIMEOUT,
        }
    }
}

/// Work loop configuration and lifecycle hooks.
#[derive(Clone)]
pub struct WorkerConfig {
    pub stop: CancellationToken,
    pub block_timeout: Duration,
    pub on_start: Option<JobHook>,
    pub on_complete: Option<JobHook>,
    pub on_error: Option<ErrorHook>,
}

impl WorkerConfig {
    pub fn new(stop: CancellationToken) -> Self {
        Self {
            stop,
            block_timeout: DEFAULT_BLOCK_TIMEOUT,
            on_start: None,
            on_complete: None,
            on_error: None,
        }
    }

    pub fn block_timeout(mut self, timeout: Duration) -> Self {
        self.block_timeout = timeout;
        self
    }

    pub fn on_start(mut self, hook: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.on_start = Some(Arc::new(hook));
        self
    }

    pub fn on_complete(mut self, hook: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&AppError, &Envelope) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("stopped", &self.stop.is_cancelled())
            .field("block_timeout", &self.block_timeout)
            .field("on_start", &self.on_start.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Lifecycle of the work loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    #[default]
    Idle,
    Running,
    /// Stop observed, in-flight job still completing
    Draining,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Idle => "idle",
            WorkerState::Running => "running",
            WorkerState::Draining => "draining",
            WorkerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Durable job queue for notifications.
pub struct QueueAdapter {
    backend: Arc<dyn QueueBackend>,
    serializer: Option<NotificationSerializer>,
    clock: Arc<dyn Clock>,
    promote_batch_size: usize,
    state: watch::Sender<WorkerState>,
}

impl QueueAdapter {
    pub fn new(backend: Arc<dyn QueueBackend>) -> Self {
        Self {
            backend,
            serializer: None,
            clock: Arc::new(SystemClock),
            promote_batch_size: DEFAULT_PROMOTE_BATCH_SIZE,
            state: watch::Sender::new(WorkerState::Idle),
        }
    }

    pub fn with_serializer(mut self, serializer: NotificationSerializer) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_promote_batch_size(mut self, batch_size: usize) -> Self {
        self.promote_batch_size = batch_size.max(1);
        self
    }

    pub fn backend(&self) -> &Arc<dyn QueueBackend> {
        &self.backend
    }

    pub fn serializer(&self) -> Option<&NotificationSerializer> {
        self.serializer.as_ref()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Serialize and store a notification.
    ///
    /// The effective delay is `options.delay_seconds`, else the notification's
    /// own delay, else zero. A positive delay (or `options.delayed`) schedules
    /// the envelope in the delayed set; otherwise it goes straight onto the
    /// immediate queue.
    pub async fn enqueue(
        &self,
        notification: &dyn Notification,
        recipient: &Recipient,
        options: EnqueueOptions,
    ) -> AppResult<()> {
        let serializer = self.serializer.as_ref().ok_or_else(|| {
            AppError::configuration("queue.serializer", "enqueue requires a notification serializer")
        })?;

        let mut envelope = serializer.serialize(notification, recipient)?;
        envelope.attempt = options.attempt;

        let payload = envelope.to_json().map_err(|e| AppError::Serialization {
            context: format!("encoding envelope for {}", envelope.notification_type),
            source: e,
        })?;

        let delay = options
            .delay_seconds
            .or_else(|| notification.delay_seconds())
            .unwrap_or(0.0)
            .max(0.0);

        if delay > 0.0 || options.delayed {
            let delay_ms = (delay * 1000.0).round().min(i64::MAX as f64) as i64;
            let due_at = self.clock.now_millis().saturating_add(delay_ms);
            self.backend.schedule(due_at, payload).await?;
            tracing::info!(
                notification_type = %envelope.notification_type,
                job_id = %envelope.id,
                attempt = envelope.attempt,
                due_at,
                queue = self.backend.queue_key(),
                "Queued notification for delayed delivery"
            );
        } else {
            self.backend.push(payload).await?;
            tracing::debug!(
                notification_type = %envelope.notification_type,
                job_id = %envelope.id,
                attempt = envelope.attempt,
                queue = self.backend.queue_key(),
                "Queued notification"
            );
        }

        Ok(())
    }

    /// Pop the next job, waiting up to the configured timeout.
    ///
    /// Returns `None` on timeout and for payloads that fail to parse; the
    /// latter are logged and dropped.
    pub async fn dequeue(&self, config: DequeueConfig) -> AppResult<Option<Envelope>> {
        self.dequeue_until(config.block_timeout, None).await
    }

    async fn dequeue_until(
        &self,
        timeout: Duration,
        stop: Option<&CancellationToken>,
    ) -> AppResult<Option<Envelope>> {
        let Some(raw) = self.backend.pop(timeout, stop).await? else {
            return Ok(None);
        };

        match Envelope::from_json(&raw) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                tracing::error!(
                    queue = self.backend.queue_key(),
                    error = %e,
                    payload = %raw,
                    "Dropping unparsable queue payload"
                );
                Ok(None)
            }
        }
    }

    /// Promote delayed jobs due by the adapter clock's current time.
    pub async fn promote_due_delayed_jobs(&self, batch_size: usize) -> AppResult<usize> {
        self.promote_due_delayed_jobs_at(self.clock.now_millis(), batch_size)
            .await
    }

    /// Move up to `batch_size` delayed jobs due at or before `now_ms` onto
    /// the immediate queue. Returns how many were moved.
    pub async fn promote_due_delayed_jobs_at(
        &self,
        now_ms: i64,
        batch_size: usize,
    ) -> AppResult<usize> {
        let promoted = self.backend.promote_due(now_ms, batch_size).await?;
        if promoted > 0 {
            tracing::debug!(
                promoted,
                queue = self.backend.queue_key(),
                "Promoted due delayed jobs"
            );
        }
        Ok(promoted)
    }

    /// Run the blocking work loop until `config.stop` is cancelled.
    ///
    /// Each iteration promotes due delayed jobs, pops one job and hands it to
    /// `handler`. Handler errors and panics go to `on_error` and never end
    /// the loop. When stop is signalled mid-job, the job is allowed to finish
    /// (state `Draining`) before the loop returns.
    pub async fn work<F, Fut>(&self, handler: F, config: WorkerConfig) -> AppResult<()>
    where
        F: Fn(Envelope) -> Fut + Send + Sync,
        Fut: Future<Output = AppResult<()>> + Send,
    {
        // A zero timeout turns every empty pop into an immediate return
        if config.block_timeout.is_zero() {
            return Err(AppError::configuration(
                "queue.block_timeout_seconds",
                "work loop needs a non-zero block timeout",
            ));
        }

        let mut busy = false;
        self.state.send_if_modified(|state| {
            if matches!(state, WorkerState::Running | WorkerState::Draining) {
                busy = true;
                false
            } else {
                *state = WorkerState::Running;
                true
            }
        });
        if busy {
            return Err(AppError::configuration(
                "queue.worker",
                "work loop is already running on this adapter",
            ));
        }

        let stop = &config.stop;
        tracing::info!(
            queue = self.backend.queue_key(),
            backend = self.backend.name(),
            block_timeout_secs = config.block_timeout.as_secs_f64(),
            "Worker started"
        );

        while !stop.is_cancelled() {
            if let Err(e) = self.promote_due_delayed_jobs(self.promote_batch_size).await {
                tracing::error!(error = %e, "Failed promoting delayed jobs");
            }

            let job = match self.dequeue_until(config.block_timeout, Some(stop)).await {
                Ok(Some(job)) => job,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to dequeue job");
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        _ = tokio::time::sleep(BACKEND_ERROR_PAUSE) => continue,
                    }
                }
            };

            if let Some(hook) = &config.on_start {
                hook(&job);
            }

            let run = AssertUnwindSafe(handler(job.clone())).catch_unwind();
            tokio::pin!(run);

            let outcome = tokio::select! {
                biased;
                outcome = &mut run => outcome,
                _ = stop.cancelled() => {
                    self.state.send_replace(WorkerState::Draining);
                    tracing::info!(
                        job_id = %job.id,
                        notification_type = %job.notification_type,
                        "Stop requested, waiting for in-flight job"
                    );
                    run.await
                }
            };

            let result = outcome.unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                Err(AppError::Internal {
                    source: anyhow::anyhow!("job handler panicked: {}", message),
                })
            });

            match result {
                Ok(()) => {
                    if let Some(hook) = &config.on_complete {
                        hook(&job);
                    }
                }
                Err(e) => {
                    tracing::error!(
                        job_id = %job.id,
                        notification_type = %job.notification_type,
                        attempt = job.attempt,
                        error = %e,
                        "Job failed"
                    );
                    if let Some(hook) = &config.on_error {
                        hook(&e, &job);
                    }
                }
            }
        }

        self.state.send_replace(WorkerState::Stopped);
        tracing::info!(queue = self.backend.queue_key(), "Worker stopped");
        Ok(())
    }
}

impl fmt::Debug for QueueAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueAdapter")
            .field("backend", &self.backend.name())
            .field("queue", &self.backend.queue_key())
            .field("serializer", &self.serializer.is_some())
            .field("state", &self.state())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{ManualClock, MemoryQueueBackend};
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[derive(Debug, Serialize, Deserialize)]
    struct Reminder {
        text: String,
        #[serde(default)]
        delay: Option<f64>,
    }

    impl Notification for Reminder {
        fn type_tag(&self) -> Option<&str> {
            Some("reminder")
        }

        fn channels(&self, _recipient: &Recipient) -> Vec<String> {
            vec!["mail".to_string()]
        }

        fn should_queue(&self) -> bool {
            true
        }

        fn delay_seconds(&self) -> Option<f64> {
            self.delay
        }
    }

    fn reminder(text: &str, delay: Option<f64>) -> Reminder {
        Reminder {
            text: text.to_string(),
            delay,
        }
    }

    const T0: i64 = 1_700_000_000_000;

    fn adapter(clock: &ManualClock) -> (QueueAdapter, Arc<MemoryQueueBackend>) {
        let backend = Arc::new(MemoryQueueBackend::new("test:queue"));
        let adapter = QueueAdapter::new(backend.clone())
            .with_serializer(NotificationSerializer::default())
            .with_clock(Arc::new(clock.clone()));
        (adapter, backend)
    }

    fn no_wait() -> DequeueConfig {
        DequeueConfig {
            block_timeout: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_enqueue_without_serializer_is_configuration_error() {
        let adapter = QueueAdapter::new(Arc::new(MemoryQueueBackend::new("q")));
        let err = adapter
            .enqueue(&reminder("x", None), &Recipient::new(), EnqueueOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
        assert!(err.is_fail_fast());
    }

    #[tokio::test]
    async fn test_immediate_enqueue_is_fifo_and_carries_attempt() {
        let clock = ManualClock::new(T0);
        let (adapter, _) = adapter(&clock);
        let recipient = Recipient::new().with_id(1_i64);

        adapter
            .enqueue(&reminder("first", None), &recipient, EnqueueOptions::default())
            .await
            .unwrap();
        let opts = EnqueueOptions {
            attempt: 3,
            ..Default::default()
        };
        adapter
            .enqueue(&reminder("second", None), &recipient, opts)
            .await
            .unwrap();

        let first = adapter.dequeue(no_wait()).await.unwrap().unwrap();
        let second = adapter.dequeue(no_wait()).await.unwrap().unwrap();
        assert_eq!(first.data["text"], "first");
        assert_eq!(first.attempt, 0);
        assert_eq!(second.data["text"], "second");
        assert_eq!(second.attempt, 3);
        assert!(adapter.dequeue(no_wait()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delayed_job_appears_only_after_promotion() {
        let clock = ManualClock::new(T0);
        let (adapter, backend) = adapter(&clock);

        adapter
            .enqueue(&reminder("later", Some(10.0)), &Recipient::new(), EnqueueOptions::default())
            .await
            .unwrap();

        assert!(adapter.dequeue(no_wait()).await.unwrap().is_none());
        assert_eq!(backend.delayed_len().await.unwrap(), 1);

        assert_eq!(adapter.promote_due_delayed_jobs_at(T0 + 9_999, 100).await.unwrap(), 0);
        assert!(adapter.dequeue(no_wait()).await.unwrap().is_none());

        clock.advance_secs(10);
        assert_eq!(adapter.promote_due_delayed_jobs(100).await.unwrap(), 1);
        let job = adapter.dequeue(no_wait()).await.unwrap().unwrap();
        assert_eq!(job.data["text"], "later");
        assert_eq!(backend.delayed_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_option_delay_overrides_notification_delay() {
        let clock = ManualClock::new(T0);
        let (adapter, backend) = adapter(&clock);

        let opts = EnqueueOptions {
            delay_seconds: Some(0.0),
            ..Default::default()
        };
        adapter
            .enqueue(&reminder("now", Some(30.0)), &Recipient::new(), opts)
            .await
            .unwrap();

        assert_eq!(backend.len().await.unwrap(), 1);
        assert_eq!(backend.delayed_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retry_options_always_use_delayed_path() {
        let clock = ManualClock::new(T0);
        let (adapter, backend) = adapter(&clock);

        adapter
            .enqueue(&reminder("retry", None), &Recipient::new(), EnqueueOptions::retry(1, 0.0))
            .await
            .unwrap();

        assert_eq!(backend.len().await.unwrap(), 0);
        assert_eq!(backend.delayed_len().await.unwrap(), 1);

        adapter.promote_due_delayed_jobs(100).await.unwrap();
        let job = adapter.dequeue(no_wait()).await.unwrap().unwrap();
        assert_eq!(job.attempt, 1);
    }

    #[tokio::test]
    async fn test_huge_delay_saturates_due_time() {
        let clock = ManualClock::new(T0);
        let (adapter, backend) = adapter(&clock);

        for delay in [1e17, f64::INFINITY] {
            adapter
                .enqueue(&reminder("far", Some(delay)), &Recipient::new(), EnqueueOptions::default())
                .await
                .unwrap();
        }

        assert_eq!(backend.delayed_len().await.unwrap(), 2);
        assert_eq!(adapter.promote_due_delayed_jobs(100).await.unwrap(), 0);
        assert_eq!(adapter.promote_due_delayed_jobs_at(i64::MAX - 1, 100).await.unwrap(), 0);
        assert_eq!(adapter.promote_due_delayed_jobs_at(i64::MAX, 100).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unparsable_payload_is_treated_as_empty() {
        let clock = ManualClock::new(T0);
        let (adapter, backend) = adapter(&clock);
        backend.push("not-json".to_string()).await.unwrap();

        assert!(adapter.dequeue(no_wait()).await.unwrap().is_none());
        assert_eq!(backend.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_work_continues_after_failing_and_panicking_jobs() {
        let clock = ManualClock::new(T0);
        let (adapter, _) = adapter(&clock);
        let adapter = Arc::new(adapter);
        let recipient = Recipient::new();

        for text in ["fail", "panic", "ok"] {
            adapter
                .enqueue(&reminder(text, None), &recipient, EnqueueOptions::default())
                .await
                .unwrap();
        }

        let stop = CancellationToken::new();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(Mutex::new(Vec::new()));
        let started = Arc::new(AtomicUsize::new(0));

        let config = WorkerConfig::new(stop.clone())
            .block_timeout(Duration::from_millis(50))
            .on_start({
                let started = started.clone();
                move |_| {
                    started.fetch_add(1, Ordering::SeqCst);
                }
            })
            .on_complete({
                let completed = completed.clone();
                let stop = stop.clone();
                move |job| {
                    completed.lock().unwrap().push(job.data["text"].to_string());
                    stop.cancel();
                }
            })
            .on_error({
                let errors = errors.clone();
                move |e, job| {
                    errors
                        .lock()
                        .unwrap()
                        .push((job.data["text"].as_str().unwrap_or_default().to_string(), e.to_string()));
                }
            });

        let handler = |job: Envelope| async move {
            match job.data["text"].as_str() {
                Some("fail") => Err(AppError::configuration("test", "boom")),
                Some("panic") => panic!("handler exploded"),
                _ => Ok(()),
            }
        };

        tokio::time::timeout(Duration::from_secs(5), adapter.work(handler, config))
            .await
            .expect("worker should stop")
            .unwrap();

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].0, "fail");
        assert_eq!(errors[1].0, "panic");
        assert_eq!(completed.lock().unwrap().len(), 1);
        assert_eq!(started.load(Ordering::SeqCst), 3);
        assert_eq!(adapter.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_during_blocking_dequeue_returns_within_timeout() {
        let clock = ManualClock::new(T0);
        let (adapter, _) = adapter(&clock);
        let adapter = Arc::new(adapter);
        let stop = CancellationToken::new();
        let block_timeout = Duration::from_secs(2);

        let worker = {
            let adapter = adapter.clone();
            let config = WorkerConfig::new(stop.clone()).block_timeout(block_timeout);
            tokio::spawn(async move { adapter.work(|_| async { Ok(()) }, config).await })
        };

        let mut state = adapter.subscribe_state();
        state
            .wait_for(|s| *s == WorkerState::Running)
            .await
            .unwrap();

        let signalled = Instant::now();
        stop.cancel();
        stop.cancel();

        tokio::time::timeout(block_timeout, worker)
            .await
            .expect("work should return within one block timeout")
            .unwrap()
            .unwrap();
        assert!(signalled.elapsed() <= block_timeout);
        assert_eq!(adapter.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_in_flight_job_drains_before_stop() {
        let clock = ManualClock::new(T0);
        let (adapter, _) = adapter(&clock);
        let adapter = Arc::new(adapter);
        adapter
            .enqueue(&reminder("slow", None), &Recipient::new(), EnqueueOptions::default())
            .await
            .unwrap();

        let stop = CancellationToken::new();
        let finished = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(tokio::sync::Notify::new());

        let worker = {
            let adapter = adapter.clone();
            let finished = finished.clone();
            let release = release.clone();
            let config = WorkerConfig::new(stop.clone()).block_timeout(Duration::from_millis(50));
            tokio::spawn(async move {
                adapter
                    .work(
                        move |_| {
                            let finished = finished.clone();
                            let release = release.clone();
                            async move {
                                release.notified().await;
                                finished.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            }
                        },
                        config,
                    )
                    .await
            })
        };

        let mut state = adapter.subscribe_state();
        state
            .wait_for(|s| *s == WorkerState::Running)
            .await
            .unwrap();
        // let the worker pick the job up
        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.cancel();
        state
            .wait_for(|s| *s == WorkerState::Draining)
            .await
            .unwrap();
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        release.notify_one();
        worker.await.unwrap().unwrap();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_work_rejects_zero_block_timeout() {
        let clock = ManualClock::new(T0);
        let (adapter, _) = adapter(&clock);

        let config = WorkerConfig::new(CancellationToken::new()).block_timeout(Duration::ZERO);
        let err = adapter.work(|_| async { Ok(()) }, config).await.unwrap_err();

        assert!(matches!(err, AppError::Configuration { ref key, .. } if key == "queue.block_timeout_seconds"));
        assert_eq!(adapter.state(), WorkerState::Idle);
    }

    #[tokio::test]
    async fn test_second_concurrent_work_call_is_rejected() {
        let clock = ManualClock::new(T0);
        let (adapter, _) = adapter(&clock);
        let adapter = Arc::new(adapter);
        let stop = CancellationToken::new();

        let worker = {
            let adapter = adapter.clone();
            let config = WorkerConfig::new(stop.clone()).block_timeout(Duration::from_millis(20));
            tokio::spawn(async move { adapter.work(|_| async { Ok(()) }, config).await })
        };
        adapter
            .subscribe_state()
            .wait_for(|s| *s == WorkerState::Running)
            .await
            .unwrap();

        let err = adapter
            .work(|_| async { Ok(()) }, WorkerConfig::new(CancellationToken::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));

        stop.cancel();
        worker.await.unwrap().unwrap();
    }
}
