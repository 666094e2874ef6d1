pub mod company_service;
pub mod lead_service;
pub mod notification_service;
pub mod session_service;
pub mod whatsapp_service;

pub use company_service::{CompanyService, CompanyView, NewCompany, NewUser, WhatsAppCredentialsInput};
pub use lead_service::{LeadInput, LeadService};
pub use notification_service::{DispatchOutcome, NotificationService};
pub use session_service::SessionService;
pub use whatsapp_service::{SendMessageInput, WebhookOutcome, WhatsAppService};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

pub(crate) const COMPANIES: &str = "companies";

/// Keeps only the digits of a phone number.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Serialize a record into a document body.
pub(crate) fn to_document<T: Serialize>(record: &T) -> Result<Map<String, Value>, ApiError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::internal("record did not serialize to an object")),
        Err(e) => Err(ApiError::internal(format!("failed to serialize record: {}", e))),
    }
}

/// Trimmed, non-empty optional string.
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
