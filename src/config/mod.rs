use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub security: SecurityConfig,
    pub meta: MetaConfig,
    pub gateway: GatewayConfig,
    pub notifications: NotificationConfig,
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

/// What to do when an ancestor lookup matches more than one mirror document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AncestorPolicy {
    FirstMatch,
    Reject,
}

/// How replace-all writes the fresh listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplaceStrategy {
    /// Delete batch, then insert batch.
    TwoBatch,
    /// Deletes and inserts in one atomic batch.
    SingleBatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub graph_url: String,
    pub graph_version: String,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub request_timeout_secs: u64,
    pub bm_list_limit: u32,
    pub ad_account_list_limit: u32,
    pub refresh_threshold_secs: i64,
    pub refresh_interval_secs: u64,
    pub ancestor_policy: AncestorPolicy,
    pub replace_strategy: ReplaceStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub queue_url: Option<String>,
    pub push_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub sweep_interval_secs: u64,
    pub idle_ttl_secs: i64,
}

impl MetaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Versioned Graph API root, e.g. `https://graph.facebook.com/v19.0`
    pub fn graph_root(&self) -> String {
        format!(
            "{}/{}",
            self.graph_url.trim_end_matches('/'),
            self.graph_version
        )
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("DASHBOARD_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Store overrides
        match env::var("STORE_BACKEND").as_deref() {
            Ok("postgres") | Ok("pg") => self.store.backend = StoreBackend::Postgres,
            Ok("memory") => self.store.backend = StoreBackend::Memory,
            _ => {}
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.store.database_url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.store.max_connections = v.parse().unwrap_or(self.store.max_connections);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Meta overrides
        if let Ok(v) = env::var("META_GRAPH_URL") {
            self.meta.graph_url = v;
        }
        if let Ok(v) = env::var("META_GRAPH_VERSION") {
            self.meta.graph_version = v;
        }
        if let Ok(v) = env::var("META_APP_ID") {
            self.meta.app_id = Some(v);
        }
        if let Ok(v) = env::var("META_APP_SECRET") {
            self.meta.app_secret = Some(v);
        }
        if let Ok(v) = env::var("META_REQUEST_TIMEOUT_SECS") {
            self.meta.request_timeout_secs = v.parse().unwrap_or(self.meta.request_timeout_secs);
        }
        if let Ok(v) = env::var("META_BM_LIST_LIMIT") {
            self.meta.bm_list_limit = v.parse().unwrap_or(self.meta.bm_list_limit);
        }
        if let Ok(v) = env::var("META_AD_ACCOUNT_LIST_LIMIT") {
            self.meta.ad_account_list_limit = v.parse().unwrap_or(self.meta.ad_account_list_limit);
        }
        if let Ok(v) = env::var("META_REFRESH_THRESHOLD_SECS") {
            self.meta.refresh_threshold_secs = v.parse().unwrap_or(self.meta.refresh_threshold_secs);
        }
        if let Ok(v) = env::var("META_REFRESH_INTERVAL_SECS") {
            self.meta.refresh_interval_secs = v.parse().unwrap_or(self.meta.refresh_interval_secs);
        }
        match env::var("META_ANCESTOR_POLICY").as_deref() {
            Ok("reject") => self.meta.ancestor_policy = AncestorPolicy::Reject,
            Ok("first-match") => self.meta.ancestor_policy = AncestorPolicy::FirstMatch,
            _ => {}
        }
        match env::var("META_REPLACE_STRATEGY").as_deref() {
            Ok("single-batch") => self.meta.replace_strategy = ReplaceStrategy::SingleBatch,
            Ok("two-batch") => self.meta.replace_strategy = ReplaceStrategy::TwoBatch,
            _ => {}
        }

        // Gateway overrides
        if let Ok(v) = env::var("GATEWAY_BASE_URL") {
            self.gateway.base_url = v;
        }
        if let Ok(v) = env::var("GATEWAY_REQUEST_TIMEOUT_SECS") {
            self.gateway.request_timeout_secs = v.parse().unwrap_or(self.gateway.request_timeout_secs);
        }

        // Notification overrides
        if let Ok(v) = env::var("QUEUE_URL") {
            self.notifications.queue_url = Some(v);
        }
        if let Ok(v) = env::var("PUSH_URL") {
            self.notifications.push_url = v;
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_SWEEP_INTERVAL_SECS") {
            self.sessions.sweep_interval_secs = v.parse().unwrap_or(self.sessions.sweep_interval_secs);
        }
        if let Ok(v) = env::var("SESSION_IDLE_TTL_SECS") {
            self.sessions.idle_ttl_secs = v.parse().unwrap_or(self.sessions.idle_ttl_secs);
        }

        self
    }

    fn meta_defaults() -> MetaConfig {
        MetaConfig {
            graph_url: "https://graph.facebook.com".to_string(),
            graph_version: "v19.0".to_string(),
            app_id: None,
            app_secret: None,
            request_timeout_secs: 10,
            bm_list_limit: 1_000_000,
            ad_account_list_limit: 200,
            refresh_threshold_secs: 5 * 60,
            refresh_interval_secs: 60,
            ancestor_policy: AncestorPolicy::FirstMatch,
            replace_strategy: ReplaceStrategy::TwoBatch,
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                database_url: None,
                max_connections: 10,
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            meta: Self::meta_defaults(),
            gateway: GatewayConfig {
                base_url: "https://api.z-api.io".to_string(),
                request_timeout_secs: 10,
            },
            notifications: NotificationConfig {
                queue_url: None,
                push_url: "https://exp.host/--/api/v2/push/send".to_string(),
            },
            sessions: SessionConfig {
                sweep_interval_secs: 60,
                idle_ttl_secs: 24 * 60 * 60,
            },
        }
    }

    fn staging() -> Self {
        let dev = Self::development();
        Self {
            environment: Environment::Staging,
            store: StoreConfig {
                backend: StoreBackend::Postgres,
                database_url: None,
                max_connections: 20,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            ..dev
        }
    }

    fn production() -> Self {
        let dev = Self::development();
        Self {
            environment: Environment::Production,
            store: StoreConfig {
                backend: StoreBackend::Postgres,
                database_url: None,
                max_connections: 50,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            sessions: SessionConfig {
                sweep_interval_secs: 60,
                idle_ttl_secs: 12 * 60 * 60,
            },
            ..dev
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

/// Environment variable holding the base64 sealing key.
pub const SEALING_KEY_VAR: &str = "SEALING_KEY";

/// Reads the sealing key straight from the environment on every call.
/// Not cached in `CONFIG` so a rotated key is picked up without a restart.
pub fn sealing_key_raw() -> Option<String> {
    env::var(SEALING_KEY_VAR).ok().filter(|v| !v.trim().is_empty())
}
