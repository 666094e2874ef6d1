use serde_json::{Map, Value};

use super::{validate_collection, validate_key, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set {
        collection: String,
        key: String,
        data: Map<String, Value>,
    },
    Delete {
        collection: String,
        key: String,
    },
}

/// Ordered set of writes applied atomically by [`super::DocumentStore::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        collection: &str,
        key: &str,
        data: Map<String, Value>,
    ) -> Result<&mut Self, StoreError> {
        validate_collection(collection)?;
        validate_key(key)?;
        self.ops.push(WriteOp::Set {
            collection: collection.to_string(),
            key: key.to_string(),
            data,
        });
        Ok(self)
    }

    pub fn delete(&mut self, collection: &str, key: &str) -> Result<&mut Self, StoreError> {
        validate_collection(collection)?;
        validate_key(key)?;
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            key: key.to_string(),
        });
        Ok(self)
    }

    /// Appends another batch's writes after this one's.
    pub fn extend(&mut self, other: WriteBatch) {
        self.ops.extend(other.ops);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
