pub mod batch;
pub mod manager;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use batch::{WriteBatch, WriteOp};
pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// Errors from the document store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// A stored document: its key within the collection plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn new(key: impl Into<String>, data: Map<String, Value>) -> Self {
        Self { key: key.into(), data }
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }
}

/// Hierarchical document store addressed by `collection/key` paths.
///
/// Collections are slash-separated paths (`companies/{id}/users`); keys never
/// contain a slash. Each `commit` is atomic on its own.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError>;

    /// Every document in a collection, ordered by key.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Documents whose top-level `field` equals `value`, ordered by key.
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError>;

    /// Upsert that keeps existing top-level fields not present in `data`.
    async fn merge(
        &self,
        collection: &str,
        key: &str,
        data: Map<String, Value>,
    ) -> Result<(), StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Single-document overwrite.
    async fn set(
        &self,
        collection: &str,
        key: &str,
        data: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.set(collection, key, data)?;
        self.commit(batch).await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, key)?;
        self.commit(batch).await
    }
}

/// Validate a collection path: non-empty segments of printable characters.
pub fn validate_collection(collection: &str) -> Result<(), StoreError> {
    if collection.is_empty()
        || collection.starts_with('/')
        || collection.ends_with('/')
        || collection.split('/').any(|segment| segment.is_empty())
    {
        return Err(StoreError::InvalidPath(format!("bad collection '{}'", collection)));
    }
    Ok(())
}

/// Validate a document key: non-empty and no slash.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains('/') {
        return Err(StoreError::InvalidPath(format!("bad document key '{}'", key)));
    }
    Ok(())
}

/// Joins path segments into a collection path.
pub fn path(segments: &[&str]) -> String {
    segments.join("/")
}
