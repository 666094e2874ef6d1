use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{decode_jwt, Claims, Role};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug, PartialEq)]
pub struct AuthUser {
    pub uid: String,
    pub company_id: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            uid: claims.uid,
            company_id: claims.company_id,
            role: claims.role,
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::permission_denied("Administrator role required"))
        }
    }

    /// Admins, or any member of `company_id`.
    pub fn require_company(&self, company_id: &str) -> Result<(), ApiError> {
        if self.is_admin() || self.company_id == company_id {
            Ok(())
        } else {
            Err(ApiError::permission_denied("Access to this company is not allowed"))
        }
    }

    /// Admins, or the owner of `company_id`.
    pub fn require_owner(&self, company_id: &str) -> Result<(), ApiError> {
        if self.is_admin() || (self.role == Role::Owner && self.company_id == company_id) {
            Ok(())
        } else {
            Err(ApiError::permission_denied("Company owner role required"))
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthenticated)?;

    let claims = decode_jwt(&token, &state.config.security.jwt_secret)
        .map_err(|e| ApiError::unauthenticated(e.to_string()))?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user(role: Role, company: &str) -> AuthUser {
        AuthUser { uid: "u1".into(), company_id: company.into(), role }
    }

    #[test]
    fn company_scoping() {
        assert!(user(Role::Member, "c1").require_company("c1").is_ok());
        assert!(user(Role::Member, "c1").require_company("c2").is_err());
        assert!(user(Role::Admin, "ops").require_company("c2").is_ok());
        assert!(user(Role::Member, "c1").require_owner("c1").is_err());
        assert!(user(Role::Owner, "c1").require_owner("c1").is_ok());
        assert_eq!(
            user(Role::Owner, "c1").require_admin().unwrap_err().error_code(),
            "permission-denied"
        );
    }

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def");
    }
}
