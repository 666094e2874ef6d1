// Boundary error taxonomy shared by every HTTP route
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::StoreError;
use crate::gateway::GatewayError;
use crate::meta::client::PlatformError;
use crate::meta::sync::SyncError;
use crate::meta::token::RefreshError;
use crate::sealing::SealError;

/// The only error vocabulary the API surfaces to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InvalidArgument(String),
    NotFound(String),
    Unauthenticated(String),
    PermissionDenied(String),
    FailedPrecondition(String),
    Internal(String),
    Unknown(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::FailedPrecondition(_) => StatusCode::PRECONDITION_FAILED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::InvalidArgument(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unauthenticated(msg)
            | ApiError::PermissionDenied(msg)
            | ApiError::FailedPrecondition(msg)
            | ApiError::Internal(msg)
            | ApiError::Unknown(msg) => msg,
        }
    }

    /// Short code callers branch on
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidArgument(_) => "invalid-argument",
            ApiError::NotFound(_) => "not-found",
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::PermissionDenied(_) => "permission-denied",
            ApiError::FailedPrecondition(_) => "failed-precondition",
            ApiError::Internal(_) => "internal",
            ApiError::Unknown(_) => "unknown",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.error_code(),
                "message": self.message()
            }
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ApiError::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        ApiError::PermissionDenied(message.into())
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        ApiError::FailedPrecondition(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        ApiError::Unknown(message.into())
    }
}

// Convert component error types to ApiError
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ApiError::not_found(msg),
            StoreError::InvalidPath(msg) => ApiError::invalid_argument(msg),
            StoreError::ConfigMissing(name) => {
                ApiError::failed_precondition(format!("Missing configuration: {}", name))
            }
            other => {
                // Don't expose backend errors to clients
                tracing::error!("Document store error: {}", other);
                ApiError::internal("An error occurred while accessing the document store")
            }
        }
    }
}

impl From<SealError> for ApiError {
    fn from(err: SealError) -> Self {
        match err {
            SealError::MissingKey | SealError::InvalidKey(_) => {
                tracing::error!("Sealing key misconfigured: {}", err);
                ApiError::failed_precondition("Credential sealing key is not configured")
            }
            SealError::Decryption(msg) => {
                tracing::error!("Credential decryption failed: {}", msg);
                ApiError::failed_precondition("Stored credentials could not be decrypted")
            }
            SealError::Encryption(msg) => {
                tracing::error!("Credential encryption failed: {}", msg);
                ApiError::internal("Failed to seal credentials")
            }
        }
    }
}

impl From<PlatformError> for ApiError {
    fn from(err: PlatformError) -> Self {
        tracing::error!("Ads platform error: {}", err);
        ApiError::internal(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        tracing::error!("Messaging gateway error: {}", err);
        ApiError::internal(err.to_string())
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::InvalidArgument(msg) => ApiError::invalid_argument(msg),
            SyncError::NotFound(msg) => ApiError::not_found(msg),
            SyncError::Ambiguous { .. } | SyncError::NoAccessToken => {
                ApiError::failed_precondition(err.to_string())
            }
            SyncError::Platform(e) => e.into(),
            SyncError::Store(e) => e.into(),
        }
    }
}

impl From<RefreshError> for ApiError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Store(e) => e.into(),
            RefreshError::Platform(e) => e.into(),
            RefreshError::Malformed(msg) => {
                tracing::error!("Access token record unreadable: {}", msg);
                ApiError::internal("Stored access token record is unreadable")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
