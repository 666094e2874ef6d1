// handlers/protected/leads.rs - GET /api/companies/:company/leads
use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

pub async fn leads_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(company_id): Path<String>,
) -> ApiResult<Value> {
    user.require_company(&company_id)?;
    let leads = state.leads().list_leads(&company_id).await?;
    Ok(ApiResponse::success(
        format!("{} lead(s)", leads.len()),
        json!({ "leads": leads }),
    ))
}
