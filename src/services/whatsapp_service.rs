use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::database::{path, DocumentStore};
use crate::error::ApiError;
use crate::gateway::{MessageKind, MessagingGateway, OutboundMessage, WebhookPayload};
use crate::notify::{QueueMessage, QueuePublisher};

use super::{normalize_phone, CompanyService, COMPANIES};

pub const WHATSAPP_RECEIVED: &str = "whatsapp.received";

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageInput {
    pub phone: String,
    #[serde(default = "default_kind")]
    pub kind: MessageKind,
    #[serde(default)]
    pub message: String,
    pub media: Option<String>,
}

fn default_kind() -> MessageKind {
    MessageKind::Text
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutcome {
    pub stored: bool,
    pub message_id: Option<String>,
}

pub fn chats_collection(company_id: &str) -> String {
    path(&[COMPANIES, company_id, "chats"])
}

pub fn messages_collection(company_id: &str, phone: &str) -> String {
    path(&[COMPANIES, company_id, "chats", phone, "messages"])
}

fn millis_to_rfc3339(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|t| t.to_rfc3339())
}

pub struct WhatsAppService {
    store: Arc<dyn DocumentStore>,
    gateway: Arc<dyn MessagingGateway>,
    queue: Arc<dyn QueuePublisher>,
}

impl WhatsAppService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        gateway: Arc<dyn MessagingGateway>,
        queue: Arc<dyn QueuePublisher>,
    ) -> Self {
        Self { store, gateway, queue }
    }

    /// Send through the company's gateway instance and record the message.
    pub async fn send_message(&self, company_id: &str, input: SendMessageInput) -> Result<Value, ApiError> {
        let phone = normalize_phone(&input.phone);
        if phone.is_empty() {
            return Err(ApiError::invalid_argument("A destination phone number is required"));
        }
        let media = input.media.filter(|m| !m.trim().is_empty());
        match (input.kind, &media) {
            (MessageKind::Text, _) if input.message.trim().is_empty() => {
                return Err(ApiError::invalid_argument("Text messages need a message body"));
            }
            (MessageKind::Image | MessageKind::Audio | MessageKind::Video, None) => {
                return Err(ApiError::invalid_argument(format!(
                    "{} messages need a media URL",
                    input.kind.as_str()
                )));
            }
            _ => {}
        }

        let credentials = CompanyService::new(self.store.clone())
            .gateway_credentials(company_id)
            .await?;
        let outbound = OutboundMessage {
            phone: phone.clone(),
            kind: input.kind,
            message: input.message,
            media,
        };
        let receipt = self.gateway.send(&credentials, &outbound).await?;

        let id = receipt
            .message_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now().to_rfc3339();
        let mut record = Map::new();
        record.insert("id".into(), json!(id));
        record.insert("phone".into(), json!(phone));
        record.insert("fromMe".into(), json!(true));
        record.insert("kind".into(), json!(outbound.kind.as_str()));
        record.insert("message".into(), json!(outbound.message));
        if let Some(media) = &outbound.media {
            record.insert("media".into(), json!(media));
        }
        if let Some(zaap_id) = &receipt.zaap_id {
            record.insert("zaapId".into(), json!(zaap_id));
        }
        record.insert("createdAt".into(), json!(now));

        let mut chat = Map::new();
        chat.insert("phone".into(), json!(phone));
        chat.insert("lastMessageAt".into(), json!(now));

        self.store
            .set(&messages_collection(company_id, &phone), &id, record.clone())
            .await?;
        self.store.merge(&chats_collection(company_id), &phone, chat).await?;

        info!("Sent {} message {} for company {}", outbound.kind.as_str(), id, company_id);
        Ok(Value::Object(record))
    }

    /// Handle one gateway callback. Anything but `ReceivedCallback` is
    /// acknowledged without side effects.
    pub async fn receive_webhook(&self, company_id: &str, payload: WebhookPayload) -> Result<WebhookOutcome, ApiError> {
        if !payload.is_received() {
            debug!("Ignoring {} callback for company {}", payload.kind, company_id);
            return Ok(WebhookOutcome { stored: false, message_id: None });
        }

        let phone = payload.phone.as_deref().map(normalize_phone).unwrap_or_default();
        if phone.is_empty() {
            return Err(ApiError::invalid_argument("Callback carries no phone number"));
        }
        if self.store.get(COMPANIES, company_id).await?.is_none() {
            return Err(ApiError::not_found(format!("Company {} not found", company_id)));
        }

        let id = payload
            .message_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let at = payload
            .momment
            .and_then(millis_to_rfc3339)
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        let (kind, content) = payload.content().unwrap_or(("unknown", Value::Null));
        let preview = payload.preview();

        let mut record = Map::new();
        record.insert("id".into(), json!(id));
        record.insert("phone".into(), json!(phone));
        record.insert("fromMe".into(), json!(payload.from_me));
        record.insert("kind".into(), json!(kind));
        if !content.is_null() {
            record.insert("content".into(), content);
        }
        record.insert("preview".into(), json!(preview));
        record.insert("createdAt".into(), json!(at));

        let mut chat = Map::new();
        chat.insert("phone".into(), json!(phone));
        chat.insert("lastMessageAt".into(), json!(at));
        chat.insert("lastMessagePreview".into(), json!(preview));
        if let Some(name) = payload.sender_name.as_deref().or(payload.chat_name.as_deref()) {
            chat.insert("senderName".into(), json!(name));
        }
        if let Some(photo) = &payload.sender_photo {
            chat.insert("senderPhoto".into(), json!(photo));
        }

        self.store.set(&messages_collection(company_id, &phone), &id, record).await?;
        self.store.merge(&chats_collection(company_id), &phone, chat).await?;

        if !payload.from_me {
            let message = QueueMessage::new(json!({
                "kind": WHATSAPP_RECEIVED,
                "companyId": company_id,
                "phone": phone,
                "messageId": id,
                "senderName": payload.sender_name,
                "preview": preview,
            }));
            if let Err(e) = self.queue.send(message).await {
                error!("Failed to publish {} for message {}: {}", WHATSAPP_RECEIVED, id, e);
            }
        }

        Ok(WebhookOutcome { stored: true, message_id: Some(id) })
    }
}
