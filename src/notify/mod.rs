// Outbound notifications: the work queue and the push service
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request timed out")]
    Timeout,

    #[error("notification request failed: {0}")]
    Transport(String),

    #[error("notification endpoint answered HTTP {0}")]
    Status(u16),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NotifyError::Timeout
        } else {
            NotifyError::Transport(err.to_string())
        }
    }
}

/// Queue envelope: consumers only look at `body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub body: Value,
}

impl QueueMessage {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    pub fn kind(&self) -> Option<&str> {
        self.body.get("kind").and_then(Value::as_str)
    }
}

#[async_trait]
pub trait QueuePublisher: Send + Sync {
    async fn send(&self, message: QueueMessage) -> Result<(), NotifyError>;
}

/// Posts queue messages to an HTTP ingestion endpoint.
pub struct HttpQueuePublisher {
    client: reqwest::Client,
    url: String,
}

impl HttpQueuePublisher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl QueuePublisher for HttpQueuePublisher {
    async fn send(&self, message: QueueMessage) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(&message).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        debug!("Queued {:?} message", message.kind());
        Ok(())
    }
}

/// Used when no queue URL is configured: messages are only logged.
#[derive(Debug, Default)]
pub struct LogQueuePublisher;

#[async_trait]
impl QueuePublisher for LogQueuePublisher {
    async fn send(&self, message: QueueMessage) -> Result<(), NotifyError> {
        info!("Queue disabled, dropping message: {}", message.body);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: Value,
}

#[async_trait]
pub trait PushDispatcher: Send + Sync {
    /// Delivers a batch; returns how many the service accepted.
    async fn dispatch(&self, messages: Vec<PushMessage>) -> Result<usize, NotifyError>;
}

pub struct HttpPushDispatcher {
    client: reqwest::Client,
    url: String,
}

impl HttpPushDispatcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PushDispatcher for HttpPushDispatcher {
    async fn dispatch(&self, messages: Vec<PushMessage>) -> Result<usize, NotifyError> {
        if messages.is_empty() {
            return Ok(0);
        }
        let response = self.client.post(&self.url).json(&messages).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        Ok(messages.len())
    }
}
