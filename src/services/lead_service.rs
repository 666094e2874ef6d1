use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::database::{path, DocumentStore};
use crate::error::ApiError;
use crate::notify::{QueueMessage, QueuePublisher};

use super::{non_empty, normalize_phone, to_document, COMPANIES};

pub const LEAD_CREATED: &str = "lead.created";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub company_id: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub message: Option<String>,
    pub created_at: String,
}

pub fn leads_collection(company_id: &str) -> String {
    path(&[COMPANIES, company_id, "leads"])
}

pub struct LeadService {
    store: Arc<dyn DocumentStore>,
    queue: Arc<dyn QueuePublisher>,
}

impl LeadService {
    pub fn new(store: Arc<dyn DocumentStore>, queue: Arc<dyn QueuePublisher>) -> Self {
        Self { store, queue }
    }

    /// Store an inbound lead and announce it on the queue.
    pub async fn capture_lead(&self, company_id: &str, input: LeadInput) -> Result<Lead, ApiError> {
        let name = non_empty(input.name.as_deref());
        let phone = input
            .phone
            .as_deref()
            .map(normalize_phone)
            .filter(|p| !p.is_empty());
        if name.is_none() && phone.is_none() {
            return Err(ApiError::invalid_argument("A lead needs a name or a phone number"));
        }

        if self.store.get(COMPANIES, company_id).await?.is_none() {
            return Err(ApiError::not_found(format!("Company {} not found", company_id)));
        }

        let lead = Lead {
            id: Uuid::new_v4().to_string(),
            company_id: company_id.to_string(),
            name,
            phone,
            email: non_empty(input.email.as_deref()).map(|e| e.to_ascii_lowercase()),
            source: non_empty(input.source.as_deref()),
            message: non_empty(input.message.as_deref()),
            created_at: Utc::now().to_rfc3339(),
        };
        self.store
            .set(&leads_collection(company_id), &lead.id, to_document(&lead)?)
            .await?;
        info!("Captured lead {} for company {}", lead.id, company_id);

        // Fire-and-forget: the lead is stored whatever the queue says
        let message = QueueMessage::new(json!({
            "kind": LEAD_CREATED,
            "companyId": company_id,
            "leadId": lead.id,
        }));
        if let Err(e) = self.queue.send(message).await {
            error!("Failed to publish {} for lead {}: {}", LEAD_CREATED, lead.id, e);
        }

        Ok(lead)
    }

    /// Leads of one company, newest first.
    pub async fn list_leads(&self, company_id: &str) -> Result<Vec<Value>, ApiError> {
        let mut leads: Vec<Value> = self
            .store
            .list(&leads_collection(company_id))
            .await?
            .into_iter()
            .map(|doc| doc.into_value())
            .collect();
        leads.sort_by(|a, b| {
            let created = |v: &Value| v.get("createdAt").and_then(Value::as_str).unwrap_or("").to_string();
            created(b).cmp(&created(a))
        });
        Ok(leads)
    }

    pub async fn get_lead(&self, company_id: &str, lead_id: &str) -> Result<Option<Lead>, ApiError> {
        load_lead(self.store.as_ref(), company_id, lead_id).await
    }
}

pub async fn load_lead(store: &dyn DocumentStore, company_id: &str, lead_id: &str) -> Result<Option<Lead>, ApiError> {
    let Some(doc) = store.get(&leads_collection(company_id), lead_id).await? else {
        return Ok(None);
    };
    serde_json::from_value(doc.into_value())
        .map(Some)
        .map_err(|e| ApiError::internal(format!("Lead {} is malformed: {}", lead_id, e)))
}
