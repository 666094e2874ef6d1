use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;

/// Success envelope: `{ "message": ..., ...payload }`.
///
/// Object payloads are spread next to `message`; anything else lands under
/// `data`.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    pub payload: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(message: impl Into<String>, payload: T) -> Self {
        Self {
            message: message.into(),
            payload,
            status_code: None,
        }
    }

    /// Create an API response with custom status code
    pub fn with_status(message: impl Into<String>, payload: T, status_code: StatusCode) -> Self {
        Self {
            message: message.into(),
            payload,
            status_code: Some(status_code),
        }
    }

    /// Create a 201 Created response
    pub fn created(message: impl Into<String>, payload: T) -> Self {
        Self::with_status(message, payload, StatusCode::CREATED)
    }

    /// Create a 202 Accepted response
    pub fn accepted(message: impl Into<String>, payload: T) -> Self {
        Self::with_status(message, payload, StatusCode::ACCEPTED)
    }

    fn envelope(self) -> Result<Value, serde_json::Error> {
        let mut body = match serde_json::to_value(&self.payload)? {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        body.insert("message".to_string(), json!(self.message));
        Ok(Value::Object(body))
    }
}

impl ApiResponse<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self::success(message, ())
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        match self.envelope() {
            Ok(body) => (status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response payload: {}", e);
                ApiError::internal("Failed to serialize response").into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
