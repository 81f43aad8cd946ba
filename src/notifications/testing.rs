//! In-memory fakes shared by the notification tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::adapters::{BroadcastAdapter, DatabaseAdapter, MailAdapter};
use super::message::{DatabaseRecord, MailMessage};
use super::notification::Notification;
use super::recipient::{Recipient, RecipientId};
use crate::queue::{Envelope, MemoryQueueBackend, QueueBackend, QueueError};

/// Configurable notification covering every capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Greeting {
    pub text: String,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub mail: bool,
    #[serde(default)]
    pub database: bool,
    #[serde(default)]
    pub broadcast_targets: Vec<String>,
    #[serde(default)]
    pub queue: bool,
    #[serde(default)]
    pub retry_limit: u32,
    #[serde(default)]
    pub delay: Option<f64>,
}

impl Greeting {
    pub fn mail_only(text: &str) -> Self {
        Self {
            text: text.to_string(),
            channels: vec!["mail".to_string()],
            mail: true,
            ..Default::default()
        }
    }

    pub fn database_only(text: &str) -> Self {
        Self {
            text: text.to_string(),
            channels: vec!["database".to_string()],
            database: true,
            ..Default::default()
        }
    }

    pub fn broadcast_to(text: &str, targets: &[&str]) -> Self {
        Self {
            text: text.to_string(),
            channels: vec!["broadcast".to_string()],
            broadcast_targets: targets.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn on(mut self, channels: &[&str]) -> Self {
        self.channels = channels.iter().map(|c| c.to_string()).collect();
        self.mail = true;
        self.database = true;
        self
    }

    pub fn queued(mut self) -> Self {
        self.queue = true;
        self
    }

    pub fn retries(mut self, limit: u32) -> Self {
        self.retry_limit = limit;
        self
    }

    pub fn delayed(mut self, seconds: f64) -> Self {
        self.delay = Some(seconds);
        self
    }
}

impl Notification for Greeting {
    fn type_tag(&self) -> Option<&str> {
        Some("greeting")
    }

    fn channels(&self, _recipient: &Recipient) -> Vec<String> {
        self.channels.clone()
    }

    fn to_mail(&self, _recipient: &Recipient) -> Option<MailMessage> {
        self.mail.then(|| MailMessage::new().subject(self.text.clone()))
    }

    fn to_database(&self, recipient: &Recipient) -> Option<DatabaseRecord> {
        self.database.then(|| {
            let user_id = recipient.id.clone().unwrap_or(RecipientId::Number(0));
            DatabaseRecord::new(user_id, "greeting").title(self.text.clone())
        })
    }

    fn to_broadcast(&self, _recipient: &Recipient) -> Option<Value> {
        (!self.broadcast_targets.is_empty()).then(|| json!({ "text": self.text }))
    }

    fn broadcast_on(&self, _recipient: &Recipient) -> Vec<String> {
        self.broadcast_targets.clone()
    }

    fn should_queue(&self) -> bool {
        self.queue
    }

    fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    fn delay_seconds(&self) -> Option<f64> {
        self.delay
    }
}

#[derive(Default)]
pub struct RecordingMail {
    sent: Mutex<Vec<(MailMessage, Recipient)>>,
}

impl RecordingMail {
    pub fn sent(&self) -> Vec<(MailMessage, Recipient)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailAdapter for RecordingMail {
    async fn send_mail(&self, message: &MailMessage, recipient: &Recipient) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((message.clone(), recipient.clone()));
        Ok(())
    }
}

pub struct FailingMail;

#[async_trait]
impl MailAdapter for FailingMail {
    async fn send_mail(&self, _message: &MailMessage, _recipient: &Recipient) -> anyhow::Result<()> {
        anyhow::bail!("smtp relay unavailable")
    }
}

#[derive(Default)]
pub struct RecordingDatabase {
    saved: Mutex<Vec<DatabaseRecord>>,
}

impl RecordingDatabase {
    pub fn saved(&self) -> Vec<DatabaseRecord> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatabaseAdapter for RecordingDatabase {
    async fn save(&self, record: &DatabaseRecord) -> anyhow::Result<()> {
        self.saved.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingBroadcast {
    published: Mutex<Vec<(String, Value)>>,
}

impl RecordingBroadcast {
    pub fn published(&self) -> Vec<(String, Value)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl BroadcastAdapter for RecordingBroadcast {
    async fn publish(&self, channel: &str, payload: &Value) -> anyhow::Result<()> {
        self.published
            .lock()
            .unwrap()
            .push((channel.to_string(), payload.clone()));
        Ok(())
    }
}

/// Memory backend that also records every push and schedule call.
pub struct RecordingBackend {
    inner: MemoryQueueBackend,
    pushed: Mutex<Vec<Envelope>>,
    scheduled: Mutex<Vec<(i64, Envelope)>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryQueueBackend::new("test:queue"),
            pushed: Mutex::new(Vec::new()),
            scheduled: Mutex::new(Vec::new()),
        })
    }

    pub fn pushed(&self) -> Vec<Envelope> {
        self.pushed.lock().unwrap().clone()
    }

    pub fn scheduled(&self) -> Vec<(i64, Envelope)> {
        self.scheduled.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn queue_key(&self) -> &str {
        self.inner.queue_key()
    }

    async fn push(&self, payload: String) -> Result<(), QueueError> {
        self.pushed
            .lock()
            .unwrap()
            .push(Envelope::from_json(&payload)?);
        self.inner.push(payload).await
    }

    async fn schedule(&self, due_at_ms: i64, payload: String) -> Result<(), QueueError> {
        self.scheduled
            .lock()
            .unwrap()
            .push((due_at_ms, Envelope::from_json(&payload)?));
        self.inner.schedule(due_at_ms, payload).await
    }

    async fn pop(
        &self,
        timeout: Duration,
        stop: Option<&CancellationToken>,
    ) -> Result<Option<String>, QueueError> {
        self.inner.pop(timeout, stop).await
    }

    async fn promote_due(&self, now_ms: i64, batch_size: usize) -> Result<usize, QueueError> {
        self.inner.promote_due(now_ms, batch_size).await
    }

    async fn len(&self) -> Result<usize, QueueError> {
        self.inner.len().await
    }

    async fn delayed_len(&self) -> Result<usize, QueueError> {
        self.inner.delayed_len().await
    }
}
