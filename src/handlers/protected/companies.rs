// handlers/protected/companies.rs - company and user provisioning
//
// POST /api/companies                     (admin)
// GET  /api/companies/:company            (company member or admin)
// PUT  /api/companies/:company/whatsapp   (owner or admin)
// POST /api/companies/:company/users      (owner or admin)
use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::Value;

use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::{CompanyView, NewCompany, NewUser, WhatsAppCredentialsInput};
use crate::state::AppState;

pub async fn company_create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(input): ApiJson<NewCompany>,
) -> ApiResult<CompanyView> {
    user.require_admin()?;
    let company = state.companies().create_company(input).await?;
    Ok(ApiResponse::created("Company created", company))
}

pub async fn company_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(company_id): Path<String>,
) -> ApiResult<CompanyView> {
    user.require_company(&company_id)?;
    let company = state.companies().get_company(&company_id).await?;
    Ok(ApiResponse::success("Company", company))
}

pub async fn whatsapp_credentials_put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(company_id): Path<String>,
    ApiJson(input): ApiJson<WhatsAppCredentialsInput>,
) -> ApiResult<CompanyView> {
    user.require_owner(&company_id)?;
    let company = state
        .companies()
        .update_whatsapp_credentials(&company_id, input)
        .await?;
    Ok(ApiResponse::success("WhatsApp credentials updated", company))
}

pub async fn user_create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(company_id): Path<String>,
    ApiJson(input): ApiJson<NewUser>,
) -> ApiResult<Value> {
    user.require_owner(&company_id)?;
    let created = state.companies().create_user(&company_id, input).await?;
    Ok(ApiResponse::created("User created", created))
}
