use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::database::{path, Document, DocumentStore, StoreError, WriteBatch};

use super::company_service::users_collection;
use super::COMPANIES;

fn sessions_collection(company_id: &str, uid: &str) -> String {
    path(&[COMPANIES, company_id, "users", uid, "sessions"])
}

/// `lastSeenAt` as epoch millis or an RFC 3339 string.
fn last_seen(session: &Document) -> Option<DateTime<Utc>> {
    match session.data.get("lastSeenAt")? {
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}

/// Periodic removal of idle user sessions
pub struct SessionService {
    store: Arc<dyn DocumentStore>,
    idle_ttl_secs: i64,
}

impl SessionService {
    pub fn new(store: Arc<dyn DocumentStore>, idle_ttl_secs: i64) -> Self {
        Self { store, idle_ttl_secs }
    }

    /// Deletes every session last seen before `now - idle_ttl`. Returns the
    /// number removed. Users are swept concurrently.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff = now - Duration::seconds(self.idle_ttl_secs);

        let mut owners = Vec::new();
        for company in self.store.list(COMPANIES).await? {
            for user in self.store.list(&users_collection(&company.key)).await? {
                owners.push(sessions_collection(&company.key, &user.key));
            }
        }

        let results = join_all(owners.iter().map(|collection| self.sweep_collection(collection, cutoff))).await;

        let mut removed = 0;
        for (collection, result) in owners.iter().zip(results) {
            match result {
                Ok(n) => removed += n,
                Err(e) => warn!("Session sweep failed for {}: {}", collection, e),
            }
        }

        if removed > 0 {
            info!("Removed {} stale sessions across {} users", removed, owners.len());
        }
        Ok(removed)
    }

    async fn sweep_collection(&self, collection: &str, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut batch = WriteBatch::new();
        for session in self.store.list(collection).await? {
            // Sessions with no readable timestamp are left alone
            if matches!(last_seen(&session), Some(seen) if seen < cutoff) {
                batch.delete(collection, &session.key)?;
            }
        }

        let removed = batch.len();
        if removed > 0 {
            self.store.commit(batch).await?;
        }
        Ok(removed)
    }
}
