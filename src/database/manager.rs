use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{StoreBackend, StoreConfig};

use super::{DocumentStore, MemoryStore, PgDocumentStore, StoreError};

/// Builds the configured document store backend
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open the store selected by configuration. Postgres backends get their
    /// table created on first connect.
    pub async fn open(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
        match config.backend {
            StoreBackend::Memory => {
                info!("Using in-memory document store");
                Ok(Arc::new(MemoryStore::new()))
            }
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
                let pool = Self::connect(url, config.max_connections).await?;
                let store = PgDocumentStore::new(pool);
                store.migrate().await?;
                info!("Using Postgres document store");
                Ok(Arc::new(store))
            }
        }
    }

    /// Create a connection pool for the given URL
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
        Self::validate_url(database_url)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        info!("Created database pool ({} max connections)", max_connections);
        Ok(pool)
    }

    fn validate_url(database_url: &str) -> Result<(), StoreError> {
        let url = url::Url::parse(database_url)
            .map_err(|_| StoreError::QueryError("Invalid database URL".to_string()))?;
        match url.scheme() {
            "postgres" | "postgresql" => Ok(()),
            other => Err(StoreError::QueryError(format!(
                "Unsupported database scheme: {}",
                other
            ))),
        }
    }
}
