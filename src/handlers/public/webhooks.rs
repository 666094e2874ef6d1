// handlers/public/webhooks.rs - POST /webhooks/whatsapp/:company
use axum::extract::{Path, State};

use crate::gateway::WebhookPayload;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::WebhookOutcome;
use crate::state::AppState;

pub async fn whatsapp_webhook(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    ApiJson(payload): ApiJson<WebhookPayload>,
) -> ApiResult<WebhookOutcome> {
    let outcome = state.whatsapp().receive_webhook(&company_id, payload).await?;
    let message = if outcome.stored { "Message stored" } else { "Callback ignored" };
    Ok(ApiResponse::success(message, outcome))
}
