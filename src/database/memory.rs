use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{validate_collection, validate_key, Document, DocumentStore, StoreError, WriteBatch, WriteOp};

type Collections = BTreeMap<String, BTreeMap<String, Map<String, Value>>>;

/// In-process document store for development and tests
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents directly under `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map(|docs| docs.len()).unwrap_or(0)
    }
}

fn to_documents(docs: Option<&BTreeMap<String, Map<String, Value>>>) -> Vec<Document> {
    docs.map(|docs| {
        docs.iter()
            .map(|(key, data)| Document::new(key.clone(), data.clone()))
            .collect()
    })
    .unwrap_or_default()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        validate_key(key)?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .map(|data| Document::new(key, data.clone())))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        validate_collection(collection)?;
        let collections = self.collections.read().await;
        Ok(to_documents(collections.get(collection)))
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        validate_collection(collection)?;
        let collections = self.collections.read().await;
        Ok(to_documents(collections.get(collection))
            .into_iter()
            .filter(|doc| doc.data.get(field) == Some(value))
            .collect())
    }

    async fn merge(
        &self,
        collection: &str,
        key: &str,
        data: Map<String, Value>,
    ) -> Result<(), StoreError> {
        validate_collection(collection)?;
        validate_key(key)?;
        let mut collections = self.collections.write().await;
        let existing = collections
            .entry(collection.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default();
        existing.extend(data);
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        // Single write lock for the whole batch keeps it atomic to readers
        let mut collections = self.collections.write().await;
        for op in batch.into_ops() {
            match op {
                WriteOp::Set { collection, key, data } => {
                    collections.entry(collection).or_default().insert(key, data);
                }
                WriteOp::Delete { collection, key } => {
                    if let Some(docs) = collections.get_mut(&collection) {
                        docs.remove(&key);
                        if docs.is_empty() {
                            collections.remove(&collection);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
