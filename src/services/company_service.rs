use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::Role;
use crate::database::{path, Document, DocumentStore};
use crate::error::ApiError;
use crate::gateway::GatewayCredentials;
use crate::sealing;

use super::{non_empty, to_document, COMPANIES};

const MAX_NAME_LEN: usize = 100;

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

/// Gateway credentials as submitted, in plaintext.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppCredentialsInput {
    pub instance: Option<String>,
    pub token: Option<String>,
    pub client_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub whatsapp: Option<WhatsAppCredentialsInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub push_token: Option<String>,
}

/// Sealed credential triple as stored on the company document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SealedWhatsApp {
    instance: Option<String>,
    token: Option<String>,
    client_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompanyRecord {
    id: String,
    name: String,
    created_at: String,
    #[serde(default)]
    whatsapp: SealedWhatsApp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialStatus {
    pub configured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppStatus {
    pub instance: CredentialStatus,
    pub token: CredentialStatus,
    pub client_token: CredentialStatus,
}

/// Company as returned to callers: credentials reduced to flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyView {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub whatsapp: WhatsAppStatus,
}

fn status(sealed: &Option<String>) -> CredentialStatus {
    // Legacy plaintext values still count as configured
    let configured = sealed
        .as_deref()
        .map(|value| !sealing::open_lenient(value).trim().is_empty())
        .unwrap_or(false);
    CredentialStatus { configured }
}

impl From<&CompanyRecord> for CompanyView {
    fn from(record: &CompanyRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            created_at: record.created_at.clone(),
            whatsapp: WhatsAppStatus {
                instance: status(&record.whatsapp.instance),
                token: status(&record.whatsapp.token),
                client_token: status(&record.whatsapp.client_token),
            },
        }
    }
}

fn seal_credentials(input: &WhatsAppCredentialsInput) -> Result<SealedWhatsApp, ApiError> {
    let seal_field = |value: &Option<String>| -> Result<Option<String>, ApiError> {
        let plain = non_empty(value.as_deref());
        Ok(sealing::seal(plain.as_deref())?)
    };
    Ok(SealedWhatsApp {
        instance: seal_field(&input.instance)?,
        token: seal_field(&input.token)?,
        client_token: seal_field(&input.client_token)?,
    })
}

pub fn users_collection(company_id: &str) -> String {
    path(&[COMPANIES, company_id, "users"])
}

pub struct CompanyService {
    store: Arc<dyn DocumentStore>,
}

impl CompanyService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create_company(&self, input: NewCompany) -> Result<CompanyView, ApiError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ApiError::invalid_argument("Company name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ApiError::invalid_argument(format!(
                "Company name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }

        let whatsapp = match &input.whatsapp {
            Some(creds) => seal_credentials(creds)?,
            None => SealedWhatsApp::default(),
        };
        let record = CompanyRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now().to_rfc3339(),
            whatsapp,
        };

        self.store.set(COMPANIES, &record.id, to_document(&record)?).await?;
        info!("Created company {} ({})", record.name, record.id);
        Ok(CompanyView::from(&record))
    }

    /// Replaces the sealed credential triple wholesale.
    pub async fn update_whatsapp_credentials(
        &self,
        company_id: &str,
        input: WhatsAppCredentialsInput,
    ) -> Result<CompanyView, ApiError> {
        let mut record = self.load(company_id).await?;
        record.whatsapp = seal_credentials(&input)?;

        self.store.set(COMPANIES, company_id, to_document(&record)?).await?;
        info!("Updated WhatsApp credentials for company {}", company_id);
        Ok(CompanyView::from(&record))
    }

    pub async fn get_company(&self, company_id: &str) -> Result<CompanyView, ApiError> {
        Ok(CompanyView::from(&self.load(company_id).await?))
    }

    pub async fn create_user(&self, company_id: &str, input: NewUser) -> Result<Value, ApiError> {
        self.load(company_id).await?;

        let email = input.email.trim().to_ascii_lowercase();
        if !EMAIL_SHAPE.is_match(&email) {
            return Err(ApiError::invalid_argument(format!("'{}' is not a valid email", input.email)));
        }
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ApiError::invalid_argument("User name is required"));
        }
        if input.role == Role::Admin {
            return Err(ApiError::invalid_argument("Company users cannot hold the admin role"));
        }

        let uid = Uuid::new_v4().to_string();
        let mut data = serde_json::Map::new();
        data.insert("uid".into(), Value::String(uid.clone()));
        data.insert("email".into(), Value::String(email));
        data.insert("name".into(), Value::String(name.to_string()));
        data.insert("role".into(), Value::String(input.role.as_str().to_string()));
        data.insert("createdAt".into(), Value::String(Utc::now().to_rfc3339()));
        if let Some(push_token) = non_empty(input.push_token.as_deref()) {
            data.insert("pushToken".into(), Value::String(push_token));
        }

        self.store.set(&users_collection(company_id), &uid, data.clone()).await?;
        info!("Created user {} in company {}", uid, company_id);
        Ok(Value::Object(data))
    }

    pub async fn list_users(&self, company_id: &str) -> Result<Vec<Document>, ApiError> {
        Ok(self.store.list(&users_collection(company_id)).await?)
    }

    /// Opens the gateway credentials with the strict `open`. Anything missing
    /// or unreadable is a failed precondition.
    pub async fn gateway_credentials(&self, company_id: &str) -> Result<GatewayCredentials, ApiError> {
        let record = self.load(company_id).await?;
        let open_field = |label: &str, value: &Option<String>| -> Result<String, ApiError> {
            let sealed = value.as_deref().ok_or_else(|| {
                ApiError::failed_precondition(format!("WhatsApp {} is not configured", label))
            })?;
            Ok(sealing::open(sealed)?)
        };

        Ok(GatewayCredentials {
            instance: open_field("instance", &record.whatsapp.instance)?,
            token: open_field("token", &record.whatsapp.token)?,
            client_token: open_field("client token", &record.whatsapp.client_token)?,
        })
    }

    pub async fn exists(&self, company_id: &str) -> Result<bool, ApiError> {
        Ok(self.store.get(COMPANIES, company_id).await?.is_some())
    }

    async fn load(&self, company_id: &str) -> Result<CompanyRecord, ApiError> {
        let doc = self
            .store
            .get(COMPANIES, company_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Company {} not found", company_id)))?;
        serde_json::from_value(doc.into_value())
            .map_err(|e| ApiError::internal(format!("Company {} is malformed: {}", company_id, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::sealing::{seal_with, SealingKey};

    // Tests here never touch SEALING_KEY: they only exercise paths that do not
    // seal, or seed documents sealed with a local key.

    fn service() -> (Arc<MemoryStore>, CompanyService) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), CompanyService::new(store))
    }

    #[tokio::test]
    async fn validates_company_name() {
        let (_, service) = service();
        let err = service.create_company(NewCompany { name: "  ".into(), whatsapp: None }).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid-argument");

        let long = "x".repeat(101);
        let err = service.create_company(NewCompany { name: long, whatsapp: None }).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid-argument");
    }

    #[tokio::test]
    async fn company_without_credentials_is_unconfigured() {
        let (_, service) = service();
        let view = service
            .create_company(NewCompany { name: "Acme".into(), whatsapp: None })
            .await
            .unwrap();
        assert!(!view.whatsapp.token.configured);

        let err = service.gateway_credentials(&view.id).await.unwrap_err();
        assert_eq!(err.error_code(), "failed-precondition");
    }

    #[tokio::test]
    async fn legacy_plaintext_counts_as_configured() {
        let (store, service) = service();
        let sealed = seal_with(&SealingKey::from_bytes([1u8; 32]), "inst").unwrap();
        store
            .set(
                COMPANIES,
                "c1",
                serde_json::json!({
                    "id": "c1",
                    "name": "Legacy",
                    "createdAt": "2024-01-01T00:00:00Z",
                    "whatsapp": {"instance": "plain-instance", "token": sealed, "clientToken": null}
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .unwrap();

        let view = service.get_company("c1").await.unwrap();
        assert!(view.whatsapp.instance.configured);
        assert!(view.whatsapp.token.configured);
        assert!(!view.whatsapp.client_token.configured);
    }

    #[tokio::test]
    async fn creates_users_under_company() {
        let (store, service) = service();
        store
            .set(
                COMPANIES,
                "c1",
                serde_json::json!({"id": "c1", "name": "Acme", "createdAt": "x"}).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();

        let user = service
            .create_user(
                "c1",
                NewUser { email: "Ana@Example.com".into(), name: "Ana".into(), role: Role::Member, push_token: None },
            )
            .await
            .unwrap();
        assert_eq!(user["email"], "ana@example.com");
        assert_eq!(store.count("companies/c1/users").await, 1);

        let err = service
            .create_user(
                "c1",
                NewUser { email: "nope".into(), name: "X".into(), role: Role::Member, push_token: None },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid-argument");

        let err = service
            .create_user(
                "missing",
                NewUser { email: "a@b.co".into(), name: "X".into(), role: Role::Owner, push_token: None },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "not-found");
    }
}
