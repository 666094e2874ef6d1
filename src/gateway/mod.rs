// WhatsApp messaging gateway client and webhook payloads
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::config::GatewayConfig;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request timed out")]
    Timeout,

    #[error("gateway request failed: {0}")]
    Transport(String),

    #[error("gateway rejected the message with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Opened (plaintext) per-company gateway credentials.
#[derive(Clone, PartialEq)]
pub struct GatewayCredentials {
    pub instance: String,
    pub token: String,
    pub client_token: String,
}

impl fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
    Video,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Audio => "audio",
            MessageKind::Video => "video",
        }
    }

    /// Gateway endpoint suffix, e.g. `send-text`
    pub fn endpoint(&self) -> String {
        format!("send-{}", self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(MessageKind::Text),
            "image" => Ok(MessageKind::Image),
            "audio" => Ok(MessageKind::Audio),
            "video" => Ok(MessageKind::Video),
            other => Err(format!("unsupported message kind '{}'", other)),
        }
    }
}

/// One outbound message
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub phone: String,
    pub kind: MessageKind,
    pub message: String,
    pub media: Option<String>,
}

impl OutboundMessage {
    /// Gateway request body: `{phone, message}` plus the media URL under the kind's name.
    pub fn body(&self) -> Value {
        let mut body = json!({
            "phone": self.phone,
            "message": self.message,
        });
        if let (Some(media), Value::Object(map)) = (&self.media, &mut body) {
            if self.kind != MessageKind::Text {
                map.insert(self.kind.as_str().to_string(), json!(media));
            }
        }
        body
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub zaap_id: Option<String>,
}

#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send(
        &self,
        credentials: &GatewayCredentials,
        message: &OutboundMessage,
    ) -> Result<SendReceipt, GatewayError>;
}

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint_url(&self, credentials: &GatewayCredentials, kind: MessageKind) -> String {
        format!(
            "{}/instances/{}/token/{}/{}",
            self.base_url,
            credentials.instance,
            credentials.token,
            kind.endpoint()
        )
    }
}

#[async_trait]
impl MessagingGateway for HttpGateway {
    async fn send(
        &self,
        credentials: &GatewayCredentials,
        message: &OutboundMessage,
    ) -> Result<SendReceipt, GatewayError> {
        let url = self.endpoint_url(credentials, message.kind);
        let response = self
            .client
            .post(&url)
            .header("Client-Token", &credentials.client_token)
            .json(&message.body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected { status: status.as_u16(), body });
        }
        Ok(response.json().await.unwrap_or_default())
    }
}

/// Inbound gateway callback. Only `ReceivedCallback` payloads carry messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub from_me: bool,
    /// Epoch millis of the message, spelled as the gateway spells it.
    #[serde(default)]
    pub momment: Option<i64>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub sender_photo: Option<String>,
    #[serde(default)]
    pub chat_name: Option<String>,
    #[serde(flatten)]
    pub content: Map<String, Value>,
}

pub const RECEIVED_CALLBACK: &str = "ReceivedCallback";

/// Content kinds recognised in inbound messages, in lookup order.
const CONTENT_KINDS: &[&str] = &["text", "audio", "image", "video", "sticker"];

impl WebhookPayload {
    pub fn is_received(&self) -> bool {
        self.kind == RECEIVED_CALLBACK
    }

    /// The content kind and its object, e.g. `("text", {"message": "hi"})`.
    pub fn content(&self) -> Option<(&'static str, Value)> {
        CONTENT_KINDS
            .iter()
            .find_map(|kind| self.content.get(*kind).map(|v| (*kind, v.clone())))
    }

    /// Short human preview used for chat metadata and push bodies.
    pub fn preview(&self) -> String {
        match self.content() {
            Some(("text", value)) => value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Some((kind, value)) => value
                .get("caption")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("[{}]", kind)),
            None => String::new(),
        }
    }
}
