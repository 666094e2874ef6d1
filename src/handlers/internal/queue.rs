// handlers/internal/queue.rs - POST /internal/queue
use axum::{extract::State, Extension};

use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::notify::QueueMessage;
use crate::services::DispatchOutcome;
use crate::state::AppState;

/// Queue consumer entry point. Accepts the `{body: {...}}` envelope.
pub async fn queue_consume(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(message): ApiJson<QueueMessage>,
) -> ApiResult<DispatchOutcome> {
    user.require_admin()?;
    let outcome = state.notifications().dispatch_queue_message(&message.body).await?;
    Ok(ApiResponse::success("Queue message dispatched", outcome))
}
