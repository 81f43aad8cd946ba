//! Notification dispatcher.
//!
//! Decides between queueing and immediate delivery, fans out to the selected
//! channels concurrently and feeds delivery failures into the retry policy.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::de::DeserializeOwned;

use super::channels::Channel;
use super::notification::{Notification, resolve_type_name};
use super::recipient::Recipient;
use super::retry::{self, RetryDecision};
use crate::error::AppResult;
use crate::queue::{EnqueueOptions, QueueAdapter};

/// Per-call dispatch options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Deliver inline even when the notification asks to be queued
    pub skip_queue: bool,
    /// Attempt number of this delivery; 0 for the first one
    pub attempt: u32,
}

impl SendOptions {
    /// Options used by the worker when re-delivering a dequeued job.
    pub fn from_queue(attempt: u32) -> Self {
        Self {
            skip_queue: true,
            attempt,
        }
    }
}

/// Dispatches notifications to channels or to the queue.
#[derive(Clone, Default)]
pub struct NotificationManager {
    channels: Vec<Arc<dyn Channel>>,
    queue: Option<Arc<QueueAdapter>>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel. A channel registered under an existing name (compared
    /// case-insensitively) replaces the earlier one in place.
    pub fn with_channel(mut self, channel: Arc<dyn Channel>) -> Self {
        match self
            .channels
            .iter_mut()
            .find(|existing| existing.name().eq_ignore_ascii_case(channel.name()))
        {
            Some(existing) => *existing = channel,
            None => self.channels.push(channel),
        }
        self
    }

    pub fn with_queue(mut self, queue: Arc<QueueAdapter>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn queue(&self) -> Option<&Arc<QueueAdapter>> {
        self.queue.as_ref()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send a notification with default options.
    pub async fn send<N>(&self, notification: &N, recipient: &Recipient) -> AppResult<()>
    where
        N: Notification + DeserializeOwned + 'static,
    {
        self.send_with(notification, recipient, SendOptions::default())
            .await
    }

    /// Send a notification, registering its type first whenever it may end
    /// up in the queue (queued delivery or a later retry).
    ///
    /// Only wiring mistakes are returned as errors. Delivery failures are
    /// handed to the retry policy and reported through the log.
    pub async fn send_with<N>(
        &self,
        notification: &N,
        recipient: &Recipient,
        options: SendOptions,
    ) -> AppResult<()>
    where
        N: Notification + DeserializeOwned + 'static,
    {
        let queueing = !options.skip_queue && notification.should_queue();
        if queueing || notification.retry_limit() > options.attempt {
            if let Some(serializer) = self.queue.as_ref().and_then(|q| q.serializer()) {
                serializer.register(notification)?;
            }
        }

        self.dispatch(notification, recipient, options).await
    }

    /// Type-erased dispatch used for notifications whose type is already
    /// registered, e.g. jobs hydrated by the worker.
    pub async fn dispatch(
        &self,
        notification: &dyn Notification,
        recipient: &Recipient,
        options: SendOptions,
    ) -> AppResult<()> {
        let outcome = match &self.queue {
            Some(queue) if !options.skip_queue && notification.should_queue() => {
                queue
                    .enqueue(notification, recipient, EnqueueOptions::default())
                    .await
            }
            _ => self.fan_out(notification, recipient).await,
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(e) if e.is_fail_fast() => Err(e),
            Err(e) => {
                self.handle_failure(notification, recipient, e, options.attempt)
                    .await
            }
        }
    }

    /// Deliver on every configured channel the notification asks for, all at
    /// once. The first failure (in channel order) stands for the whole fan-out.
    async fn fan_out(&self, notification: &dyn Notification, recipient: &Recipient) -> AppResult<()> {
        let wanted: HashSet<String> = notification
            .channels(recipient)
            .into_iter()
            .map(|name| name.to_lowercase())
            .collect();

        let selected: Vec<&Arc<dyn Channel>> = self
            .channels
            .iter()
            .filter(|channel| wanted.contains(&channel.name().to_lowercase()))
            .collect();

        let results = join_all(
            selected
                .iter()
                .map(|channel| channel.send(notification, recipient)),
        )
        .await;

        let mut failure = None;
        for (channel, result) in selected.iter().zip(results) {
            let Err(e) = result else { continue };
            if failure.is_none() {
                failure = Some(e);
            } else {
                tracing::warn!(
                    channel = channel.name(),
                    recipient = %recipient.label(),
                    error = %e,
                    "Additional channel failure in the same delivery"
                );
            }
        }

        failure.map_or(Ok(()), Err)
    }

    async fn handle_failure(
        &self,
        notification: &dyn Notification,
        recipient: &Recipient,
        error: crate::error::AppError,
        attempt: u32,
    ) -> AppResult<()> {
        let notification_type =
            resolve_type_name(notification).unwrap_or_else(|| "<untyped>".to_string());

        match retry::decide(notification, &error, attempt) {
            RetryDecision::Exhausted { retry_limit } => {
                tracing::error!(
                    notification_type = %notification_type,
                    recipient = %recipient.label(),
                    attempt,
                    retry_limit,
                    error = ?error,
                    "Notification failed permanently"
                );
                Ok(())
            }
            RetryDecision::Skipped => {
                tracing::warn!(
                    notification_type = %notification_type,
                    recipient = %recipient.label(),
                    attempt,
                    error = %error,
                    "Notification skipped retry"
                );
                Ok(())
            }
            RetryDecision::Retry {
                attempt: next_attempt,
                backoff_seconds,
            } => {
                tracing::warn!(
                    notification_type = %notification_type,
                    recipient = %recipient.label(),
                    attempt = next_attempt,
                    retry_limit = notification.retry_limit(),
                    backoff_seconds,
                    error = %error,
                    "Retrying notification"
                );

                let Some(queue) = &self.queue else {
                    tracing::error!(
                        notification_type = %notification_type,
                        "No queue adapter configured; cannot retry notification"
                    );
                    return Ok(());
                };

                let options = EnqueueOptions::retry(next_attempt, backoff_seconds);
                match queue.enqueue(notification, recipient, options).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.is_fail_fast() => Err(e),
                    Err(e) => {
                        tracing::error!(
                            notification_type = %notification_type,
                            attempt = next_attempt,
                            error = ?e,
                            "Failed to enqueue retry"
                        );
                        Ok(())
                    }
                }
            }
        }
    }
}

impl fmt::Debug for NotificationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationManager")
            .field("channels", &self.channel_names())
            .field("queue", &self.queue)
            .finish()
    }
}
