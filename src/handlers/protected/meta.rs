// handlers/protected/meta.rs - ads sync and platform token (admin only)
//
// POST /api/meta/sync
// GET  /api/meta/token
// PUT  /api/meta/token
use axum::{extract::State, Extension};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::meta::sync::SyncOutcome;
use crate::meta::token::{expiry_from, load_token, save_token, AccessTokenState};
use crate::meta::SyncRequest;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

pub async fn sync_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<SyncRequest>,
) -> ApiResult<SyncOutcome> {
    user.require_admin()?;
    let outcome = state.ads_sync().sync(request).await?;
    Ok(ApiResponse::success(outcome.message.clone(), outcome))
}

pub async fn token_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    user.require_admin()?;
    let stored = load_token(state.store.as_ref()).await?;

    // Never echo the token itself
    let status = match stored {
        Some(token) => json!({
            "configured": true,
            "expiresAtEpochMillis": token.expires_at_epoch_millis,
            "expiresAt": token.expires_at(),
            "needsRefresh": token.needs_refresh(Utc::now(), state.config.meta.refresh_threshold_secs),
            "version": token.version,
        }),
        None => json!({ "configured": false }),
    };
    Ok(ApiResponse::success("Access token status", status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInput {
    pub token: String,
    /// Seconds from now; defaults to 60 days.
    pub expires_in: Option<i64>,
}

pub async fn token_put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(input): ApiJson<TokenInput>,
) -> ApiResult<Value> {
    user.require_admin()?;
    let token = input.token.trim();
    if token.is_empty() {
        return Err(ApiError::invalid_argument("token is required"));
    }
    let expires_in = input.expires_in.unwrap_or(60 * 24 * 60 * 60);
    if expires_in <= 0 {
        return Err(ApiError::invalid_argument("expiresIn must be positive"));
    }

    let expires_at_epoch_millis = expiry_from(Utc::now(), expires_in)
        .ok_or_else(|| ApiError::invalid_argument("expiresIn is out of range"))?;

    let store = state.store.as_ref();
    let previous = load_token(store).await?.map(|t| t.version).unwrap_or(0);
    let record = AccessTokenState {
        token: token.to_string(),
        expires_at_epoch_millis,
        version: previous + 1,
    };
    save_token(store, &record).await?;

    tracing::info!("Access token replaced by {} (version {})", user.uid, record.version);
    Ok(ApiResponse::success(
        "Access token stored",
        json!({
            "expiresAtEpochMillis": record.expires_at_epoch_millis,
            "version": record.version,
        }),
    ))
}
