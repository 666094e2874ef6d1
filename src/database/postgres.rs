use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{types::Json, PgPool};

use super::{validate_collection, validate_key, Document, DocumentStore, StoreError, WriteBatch, WriteOp};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        key TEXT NOT NULL,
        data JSONB NOT NULL DEFAULT '{}'::jsonb,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (collection, key)
    )
"#;

/// Document store backed by a single Postgres `documents` table
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the backing table if it does not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

fn into_document((key, data): (String, Json<Value>)) -> Document {
    let data = match data.0 {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Document::new(key, data)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        validate_key(key)?;
        let row: Option<(String, Json<Value>)> =
            sqlx::query_as("SELECT key, data FROM documents WHERE collection = $1 AND key = $2")
                .bind(collection)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(into_document))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        validate_collection(collection)?;
        let rows: Vec<(String, Json<Value>)> =
            sqlx::query_as("SELECT key, data FROM documents WHERE collection = $1 ORDER BY key")
                .bind(collection)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(into_document).collect())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        validate_collection(collection)?;
        let rows: Vec<(String, Json<Value>)> = sqlx::query_as(
            "SELECT key, data FROM documents WHERE collection = $1 AND data -> $2 = $3 ORDER BY key",
        )
        .bind(collection)
        .bind(field)
        .bind(Json(value))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_document).collect())
    }

    async fn merge(
        &self,
        collection: &str,
        key: &str,
        data: Map<String, Value>,
    ) -> Result<(), StoreError> {
        validate_collection(collection)?;
        validate_key(key)?;
        sqlx::query(
            r#"
            INSERT INTO documents (collection, key, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key)
            DO UPDATE SET data = documents.data || EXCLUDED.data, updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(Json(Value::Object(data)))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for op in batch.into_ops() {
            match op {
                WriteOp::Set { collection, key, data } => {
                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, key, data)
                        VALUES ($1, $2, $3)
                        ON CONFLICT (collection, key)
                        DO UPDATE SET data = EXCLUDED.data, updated_at = now()
                        "#,
                    )
                    .bind(&collection)
                    .bind(&key)
                    .bind(Json(Value::Object(data)))
                    .execute(&mut *tx)
                    .await?;
                }
                WriteOp::Delete { collection, key } => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND key = $2")
                        .bind(&collection)
                        .bind(&key)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
