use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::MetaConfig;

/// Failures talking to the ads platform. All of them surface as `internal`.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("ads platform request timed out")]
    Timeout,

    #[error("ads platform request failed: {0}")]
    Transport(String),

    #[error("ads platform error {code} ({kind}): {message} [fbtrace_id={fbtrace_id}]")]
    Api {
        code: i64,
        kind: String,
        message: String,
        fbtrace_id: String,
    },

    #[error("unexpected ads platform response: {0}")]
    InvalidResponse(String),

    #[error("ads platform not configured: {0}")]
    Config(&'static str),
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PlatformError::Timeout
        } else {
            PlatformError::Transport(err.to_string())
        }
    }
}

/// One GET against the Graph API: `{root}/{path}?access_token=..&fields=..&...`
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRequest {
    pub path: String,
    pub access_token: String,
    pub params: Vec<(String, String)>,
}

impl GraphRequest {
    pub fn new(path: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            access_token: access_token.into(),
            params: Vec::new(),
        }
    }

    pub fn fields(self, fields: &[&str]) -> Self {
        self.param("fields", fields.join(","))
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Result of a long-lived token exchange
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExchangedToken {
    pub access_token: String,
    /// Seconds until expiry; absent for tokens the platform does not expire.
    pub expires_in: Option<i64>,
}

/// Remote ads platform as seen by the sync component
#[async_trait]
pub trait AdsPlatform: Send + Sync {
    /// Lists the `data` array of a Graph edge (first page only).
    async fn list(&self, request: GraphRequest) -> Result<Vec<Map<String, Value>>, PlatformError>;

    /// Exchanges a long-lived token for a renewed one.
    async fn exchange_token(&self, token: &str) -> Result<ExchangedToken, PlatformError>;
}

/// Graph API client over reqwest
pub struct HttpAdsPlatform {
    client: reqwest::Client,
    root: String,
    app_id: Option<String>,
    app_secret: Option<String>,
}

impl HttpAdsPlatform {
    pub fn new(config: &MetaConfig) -> Result<Self, PlatformError> {
        Self::with_timeout(config, config.request_timeout())
    }

    pub fn with_timeout(config: &MetaConfig, timeout: Duration) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            root: config.graph_root(),
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, PlatformError> {
        let url = format!("{}/{}", self.root, path.trim_start_matches('/'));
        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;
        check_graph_body(status.as_u16(), body)
    }
}

#[async_trait]
impl AdsPlatform for HttpAdsPlatform {
    async fn list(&self, request: GraphRequest) -> Result<Vec<Map<String, Value>>, PlatformError> {
        let mut query = vec![("access_token".to_string(), request.access_token.clone())];
        query.extend(request.params.iter().cloned());

        tracing::debug!("Graph GET {} params={:?}", request.path, request.params);
        let body = self.get_json(&request.path, &query).await?;
        extract_data(body)
    }

    async fn exchange_token(&self, token: &str) -> Result<ExchangedToken, PlatformError> {
        let app_id = self.app_id.as_deref().ok_or(PlatformError::Config("META_APP_ID"))?;
        let app_secret = self
            .app_secret
            .as_deref()
            .ok_or(PlatformError::Config("META_APP_SECRET"))?;

        let query = vec![
            ("grant_type".to_string(), "fb_exchange_token".to_string()),
            ("client_id".to_string(), app_id.to_string()),
            ("client_secret".to_string(), app_secret.to_string()),
            ("fb_exchange_token".to_string(), token.to_string()),
        ];
        let body = self.get_json("oauth/access_token", &query).await?;
        serde_json::from_value(body).map_err(|e| PlatformError::InvalidResponse(e.to_string()))
    }
}

/// Maps the Graph error envelope `{error: {code, type, message, fbtrace_id}}`
/// and non-2xx statuses into [`PlatformError::Api`].
pub fn check_graph_body(status: u16, body: Value) -> Result<Value, PlatformError> {
    if let Some(error) = body.get("error") {
        return Err(PlatformError::Api {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(i64::from(status)),
            kind: error
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("UnknownError")
                .to_string(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
            fbtrace_id: error
                .get("fbtrace_id")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
        });
    }
    if !(200..300).contains(&status) {
        return Err(PlatformError::Api {
            code: i64::from(status),
            kind: "HttpError".to_string(),
            message: format!("HTTP {}", status),
            fbtrace_id: String::new(),
        });
    }
    Ok(body)
}

/// Pulls the object items out of `{data: [...]}`. Non-object items are dropped.
pub fn extract_data(body: Value) -> Result<Vec<Map<String, Value>>, PlatformError> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(obj) => Some(obj),
                    _ => None,
                })
                .collect()),
            Some(_) => Err(PlatformError::InvalidResponse("'data' is not an array".to_string())),
            None => Err(PlatformError::InvalidResponse("missing 'data'".to_string())),
        },
        _ => Err(PlatformError::InvalidResponse("body is not an object".to_string())),
    }
}
