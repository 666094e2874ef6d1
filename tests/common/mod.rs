#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Map, Value};
use tower::ServiceExt;

use dashboard_api::auth::{generate_jwt, Claims, Role};
use dashboard_api::config::AppConfig;
use dashboard_api::database::{DocumentStore, MemoryStore};
use dashboard_api::gateway::{GatewayCredentials, GatewayError, MessagingGateway, OutboundMessage, SendReceipt};
use dashboard_api::meta::client::ExchangedToken;
use dashboard_api::meta::{AdsPlatform, GraphRequest, PlatformError};
use dashboard_api::notify::{NotifyError, PushDispatcher, PushMessage, QueueMessage, QueuePublisher};
use dashboard_api::{app, AppState};

/// Base64 of 32 bytes 0x00..0x1f. Every test binary uses this same key.
pub const TEST_SEALING_KEY: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";
pub const TEST_JWT_SECRET: &str = "integration-test-secret";

static ENV: Once = Once::new();

pub fn init_env() {
    ENV.call_once(|| {
        std::env::set_var("SEALING_KEY", TEST_SEALING_KEY);
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
            .with_test_writer()
            .try_init();
    });
}

pub fn obj(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object literal")
}

/// Ads platform fake: one scripted listing per Graph path.
#[derive(Default)]
pub struct ScriptedPlatform {
    listings: Mutex<HashMap<String, Vec<Value>>>,
    pub requests: Mutex<Vec<GraphRequest>>,
}

impl ScriptedPlatform {
    pub fn answer(&self, path: &str, items: Value) {
        let items = items.as_array().cloned().unwrap_or_default();
        self.listings.lock().unwrap().insert(path.to_string(), items);
    }

    pub fn last_request(&self) -> Option<GraphRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AdsPlatform for ScriptedPlatform {
    async fn list(&self, request: GraphRequest) -> Result<Vec<Map<String, Value>>, PlatformError> {
        let items = self.listings.lock().unwrap().get(&request.path).cloned();
        self.requests.lock().unwrap().push(request.clone());
        match items {
            Some(items) => Ok(items.into_iter().filter_map(|v| v.as_object().cloned()).collect()),
            None => Err(PlatformError::Api {
                code: 100,
                kind: "GraphMethodException".to_string(),
                message: format!("no scripted answer for {}", request.path),
                fbtrace_id: "test".to_string(),
            }),
        }
    }

    async fn exchange_token(&self, token: &str) -> Result<ExchangedToken, PlatformError> {
        Ok(ExchangedToken {
            access_token: format!("{}-renewed", token),
            expires_in: Some(3600),
        })
    }
}

#[derive(Default)]
pub struct RecordingGateway {
    pub sent: Mutex<Vec<(GatewayCredentials, OutboundMessage)>>,
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send(
        &self,
        credentials: &GatewayCredentials,
        message: &OutboundMessage,
    ) -> Result<SendReceipt, GatewayError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((credentials.clone(), message.clone()));
        Ok(SendReceipt {
            message_id: Some(format!("gw-{}", sent.len())),
            zaap_id: None,
        })
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    pub sent: Mutex<Vec<QueueMessage>>,
}

impl RecordingQueue {
    pub fn kinds(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| m.kind().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl QueuePublisher for RecordingQueue {
    async fn send(&self, message: QueueMessage) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPush {
    pub sent: Mutex<Vec<PushMessage>>,
}

#[async_trait]
impl PushDispatcher for RecordingPush {
    async fn dispatch(&self, messages: Vec<PushMessage>) -> Result<usize, NotifyError> {
        let n = messages.len();
        self.sent.lock().unwrap().extend(messages);
        Ok(n)
    }
}

/// The router wired to in-memory fakes.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub platform: Arc<ScriptedPlatform>,
    pub gateway: Arc<RecordingGateway>,
    pub queue: Arc<RecordingQueue>,
    pub push: Arc<RecordingPush>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        init_env();

        let mut config = AppConfig::from_env();
        config.security.jwt_secret = TEST_JWT_SECRET.to_string();
        adjust(&mut config);

        let store = Arc::new(MemoryStore::new());
        let platform = Arc::new(ScriptedPlatform::default());
        let gateway = Arc::new(RecordingGateway::default());
        let queue = Arc::new(RecordingQueue::default());
        let push = Arc::new(RecordingPush::default());

        let state = AppState {
            config: Arc::new(config),
            store: store.clone(),
            platform: platform.clone(),
            gateway: gateway.clone(),
            queue: queue.clone(),
            push: push.clone(),
        };

        Self {
            router: app(state.clone()),
            state,
            store,
            platform,
            gateway,
            queue,
            push,
        }
    }

    pub fn token(&self, uid: &str, company: &str, role: Role) -> String {
        generate_jwt(&Claims::new(uid, company, role, 1), TEST_JWT_SECRET).expect("sign test token")
    }

    pub fn admin(&self) -> String {
        self.token("ops", "platform", Role::Admin)
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self.router.clone().oneshot(request).await.expect("infallible router");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, token, Some(body)).await
    }

    /// Creates a company through the API and returns its id.
    pub async fn create_company(&self, name: &str, whatsapp: Option<Value>) -> String {
        let mut body = json!({ "name": name });
        if let Some(whatsapp) = whatsapp {
            body["whatsapp"] = whatsapp;
        }
        let (status, body) = self.post("/api/companies", Some(&self.admin()), body).await;
        assert_eq!(status, StatusCode::CREATED, "create company failed: {body}");
        body["id"].as_str().expect("company id").to_string()
    }

    /// Stores a platform access token directly, valid for a day.
    pub async fn seed_access_token(&self) {
        let expires = chrono::Utc::now().timestamp_millis() + 24 * 60 * 60 * 1000;
        self.store
            .set(
                "meta_config",
                "access_token",
                obj(json!({"token": "tok", "expiresAtEpochMillis": expires, "version": 1})),
            )
            .await
            .expect("seed token");
    }
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("")
}
