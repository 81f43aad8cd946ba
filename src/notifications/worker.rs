//! Worker service: runs the queue work loop for the lifetime of the process
//! and hands every dequeued job back to the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use super::manager::{NotificationManager, SendOptions};
use super::notification::Notification;
use super::recipient::Recipient;
use crate::error::AppResult;
use crate::queue::{Envelope, QueueAdapter, WorkerConfig, WorkerState};

/// Job data delivered as-is when no serializer is configured.
///
/// Channel names are read from `data.channels`; no channel capabilities are
/// available, so only custom channels can act on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawNotification {
    pub data: Value,
}

impl RawNotification {
    pub fn new(data: Value) -> Self {
        Self { data }
    }
}

impl Notification for RawNotification {
    fn channels(&self, _recipient: &Recipient) -> Vec<String> {
        match self.data.get("channels") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(single)) => vec![single.clone()],
            _ => Vec::new(),
        }
    }
}

/// Process-level worker around [`QueueAdapter::work`].
#[derive(Debug, Clone)]
pub struct NotificationWorker {
    queue: Arc<QueueAdapter>,
    manager: NotificationManager,
}

impl NotificationWorker {
    pub fn new(queue: Arc<QueueAdapter>, manager: NotificationManager) -> Self {
        Self { queue, manager }
    }

    pub fn state(&self) -> WorkerState {
        self.queue.state()
    }

    /// Run until Ctrl+C or SIGTERM.
    ///
    /// The signal listener lives only for this call and is torn down on exit,
    /// whether the loop ended cleanly or not.
    pub async fn start(&self, block_timeout: Duration) -> AppResult<()> {
        let stop = CancellationToken::new();
        let listener = tokio::spawn(stop_on_signal(stop.clone()));

        let result = self.run(stop, block_timeout).await;

        listener.abort();
        match &result {
            Ok(()) => tracing::info!("Worker stopped gracefully"),
            Err(e) => tracing::error!(error = ?e, "Worker stopped with error"),
        }
        result
    }

    /// Run the work loop until `stop` is cancelled.
    pub async fn run(&self, stop: CancellationToken, block_timeout: Duration) -> AppResult<()> {
        tracing::info!(
            backend = self.queue.backend().name(),
            queue = self.queue.backend().queue_key(),
            block_timeout_secs = block_timeout.as_secs_f64(),
            channels = ?self.manager.channel_names(),
            "Notification worker started"
        );

        let config = WorkerConfig::new(stop).block_timeout(block_timeout);
        self.queue.work(|job| self.process_job(job), config).await
    }

    /// Deliver one dequeued job. Failures are logged here and never returned,
    /// so a bad job cannot stop the loop.
    pub async fn process_job(&self, job: Envelope) -> AppResult<()> {
        let notification_type = job.notification_type.clone();
        let recipient = job.recipient.label();
        tracing::info!(
            notification_type = %notification_type,
            job_id = %job.id,
            attempt = job.attempt,
            "Processing job"
        );

        match self.deliver(job).await {
            Ok(()) => tracing::info!(
                notification_type = %notification_type,
                recipient = %recipient,
                "Processed job"
            ),
            Err(e) => tracing::error!(
                notification_type = %notification_type,
                recipient = %recipient,
                error = ?e,
                "Error processing job"
            ),
        }

        Ok(())
    }

    async fn deliver(&self, job: Envelope) -> AppResult<()> {
        let notification: Box<dyn Notification> = match self.queue.serializer() {
            Some(serializer) => serializer.hydrate(&job.notification_type, job.data)?,
            None => Box::new(RawNotification::new(job.data)),
        };

        self.manager
            .dispatch(
                notification.as_ref(),
                &job.recipient,
                SendOptions::from_queue(job.attempt),
            )
            .await
    }
}

/// Cancels `stop` on the first Ctrl+C or SIGTERM. Cancelling twice is a no-op.
async fn stop_on_signal(stop: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down worker");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down worker");
        }
    }

    stop.cancel();
}
