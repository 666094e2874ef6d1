// handlers/public/leads.rs - POST /public/companies/:company/leads
use axum::extract::{Path, State};

use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::lead_service::Lead;
use crate::services::LeadInput;
use crate::state::AppState;

/// Webhook-style capture from landing pages and forms.
pub async fn lead_capture(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    ApiJson(input): ApiJson<LeadInput>,
) -> ApiResult<Lead> {
    let lead = state.leads().capture_lead(&company_id, input).await?;
    Ok(ApiResponse::created("Lead captured", lead))
}
