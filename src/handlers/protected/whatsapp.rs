// handlers/protected/whatsapp.rs - POST /api/companies/:company/whatsapp/messages
use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::Value;

use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::SendMessageInput;
use crate::state::AppState;

pub async fn message_send(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(company_id): Path<String>,
    ApiJson(input): ApiJson<SendMessageInput>,
) -> ApiResult<Value> {
    user.require_company(&company_id)?;
    let message = state.whatsapp().send_message(&company_id, input).await?;
    Ok(ApiResponse::success("Message sent", message))
}
