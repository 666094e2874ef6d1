// handlers/protected/auth.rs - GET /api/auth/whoami
use axum::Extension;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};

pub async fn whoami(Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(
        "Authenticated",
        json!({
            "uid": user.uid,
            "companyId": user.company_id,
            "role": user.role,
        }),
    ))
}
