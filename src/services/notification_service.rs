use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::database::DocumentStore;
use crate::error::ApiError;
use crate::notify::{PushDispatcher, PushMessage};

use super::company_service::users_collection;
use super::lead_service::{load_lead, LEAD_CREATED};
use super::whatsapp_service::WHATSAPP_RECEIVED;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub kind: String,
    pub recipients: usize,
    pub delivered: usize,
}

/// Queue consumer turning domain events into push notifications
pub struct NotificationService {
    store: Arc<dyn DocumentStore>,
    push: Arc<dyn PushDispatcher>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn DocumentStore>, push: Arc<dyn PushDispatcher>) -> Self {
        Self { store, push }
    }

    pub async fn dispatch_queue_message(&self, body: &Value) -> Result<DispatchOutcome, ApiError> {
        let kind = body
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::invalid_argument("Queue message has no kind"))?;
        let company_id = body
            .get("companyId")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::invalid_argument("Queue message has no companyId"))?;

        let (title, text, data) = match kind {
            LEAD_CREATED => self.lead_notification(company_id, body).await?,
            WHATSAPP_RECEIVED => whatsapp_notification(body),
            other => {
                return Err(ApiError::invalid_argument(format!("Unknown queue message kind '{}'", other)));
            }
        };

        let messages: Vec<PushMessage> = self
            .push_tokens(company_id)
            .await?
            .into_iter()
            .map(|to| PushMessage {
                to,
                title: title.clone(),
                body: text.clone(),
                data: data.clone(),
            })
            .collect();
        let recipients = messages.len();

        // Push failures are reported, not retried
        let delivered = match self.push.dispatch(messages).await {
            Ok(n) => n,
            Err(e) => {
                error!("Push dispatch for {} in company {} failed: {}", kind, company_id, e);
                0
            }
        };

        info!(
            "Dispatched {} to {}/{} devices in company {}",
            kind, delivered, recipients, company_id
        );
        Ok(DispatchOutcome {
            kind: kind.to_string(),
            recipients,
            delivered,
        })
    }

    async fn lead_notification(&self, company_id: &str, body: &Value) -> Result<(String, String, Value), ApiError> {
        let lead_id = body
            .get("leadId")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::invalid_argument("lead.created message has no leadId"))?;

        let lead = load_lead(self.store.as_ref(), company_id, lead_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Lead {} not found", lead_id)))?;

        let who = lead
            .name
            .clone()
            .or_else(|| lead.phone.clone())
            .unwrap_or_else(|| "Someone".to_string());
        let text = match &lead.source {
            Some(source) => format!("{} via {}", who, source),
            None => who,
        };
        Ok((
            "New lead".to_string(),
            text,
            json!({"kind": LEAD_CREATED, "companyId": company_id, "leadId": lead_id}),
        ))
    }

    async fn push_tokens(&self, company_id: &str) -> Result<Vec<String>, ApiError> {
        Ok(self
            .store
            .list(&users_collection(company_id))
            .await?
            .iter()
            .filter_map(|user| user.get_str("pushToken").map(str::to_string))
            .filter(|token| !token.is_empty())
            .collect())
    }
}

fn whatsapp_notification(body: &Value) -> (String, String, Value) {
    let sender = body
        .get("senderName")
        .and_then(Value::as_str)
        .or_else(|| body.get("phone").and_then(Value::as_str))
        .unwrap_or("WhatsApp");
    let preview = body.get("preview").and_then(Value::as_str).unwrap_or_default();
    (
        sender.to_string(),
        preview.to_string(),
        json!({
            "kind": WHATSAPP_RECEIVED,
            "companyId": body.get("companyId"),
            "phone": body.get("phone"),
        }),
    )
}
