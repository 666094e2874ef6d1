use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::database::{DocumentStore, StoreError};

use super::client::{AdsPlatform, PlatformError};

pub const TOKEN_COLLECTION: &str = "meta_config";
pub const TOKEN_KEY: &str = "access_token";

/// Lifetime assumed when the exchange response carries no `expires_in`.
const DEFAULT_LIFETIME_SECS: i64 = 60 * 24 * 60 * 60;

/// Process-wide platform token. Lives in the document store, never in memory,
/// so concurrent invocations see the same record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenState {
    pub token: String,
    pub expires_at_epoch_millis: i64,
    #[serde(default)]
    pub version: u64,
}

impl AccessTokenState {
    pub fn needs_refresh(&self, now: DateTime<Utc>, threshold_secs: i64) -> bool {
        self.expires_at_epoch_millis.saturating_sub(now.timestamp_millis()) < threshold_secs.saturating_mul(1000)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.expires_at_epoch_millis)
    }
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("stored token record is malformed: {0}")]
    Malformed(String),
}

/// Reads the token record, if one has been configured.
pub async fn load_token(store: &dyn DocumentStore) -> Result<Option<AccessTokenState>, RefreshError> {
    let Some(doc) = store.get(TOKEN_COLLECTION, TOKEN_KEY).await? else {
        return Ok(None);
    };
    serde_json::from_value(doc.into_value())
        .map(Some)
        .map_err(|e| RefreshError::Malformed(e.to_string()))
}

/// Overwrites the token record.
pub async fn save_token(store: &dyn DocumentStore, state: &AccessTokenState) -> Result<(), RefreshError> {
    let data = match serde_json::to_value(state) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => return Err(RefreshError::Malformed(e.to_string())),
    };
    store.set(TOKEN_COLLECTION, TOKEN_KEY, data).await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    NotConfigured,
    StillValid { expires_at_epoch_millis: i64 },
    Refreshed { expires_at_epoch_millis: i64, version: u64 },
}

/// Scheduled token renewal
/// `now + lifetime_secs` in epoch millis, `None` on overflow.
pub fn expiry_from(now: DateTime<Utc>, lifetime_secs: i64) -> Option<i64> {
    lifetime_secs
        .checked_mul(1000)
        .and_then(|ms| now.timestamp_millis().checked_add(ms))
}

pub struct TokenRefresher {
    store: Arc<dyn DocumentStore>,
    platform: Arc<dyn AdsPlatform>,
    threshold_secs: i64,
}

impl TokenRefresher {
    pub fn new(store: Arc<dyn DocumentStore>, platform: Arc<dyn AdsPlatform>, threshold_secs: i64) -> Self {
        Self {
            store,
            platform,
            threshold_secs,
        }
    }

    /// One tick: exchange the token when it expires within the threshold.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RefreshOutcome, RefreshError> {
        let Some(state) = load_token(self.store.as_ref()).await? else {
            warn!("Token refresh skipped: no access token configured");
            return Ok(RefreshOutcome::NotConfigured);
        };

        if !state.needs_refresh(now, self.threshold_secs) {
            return Ok(RefreshOutcome::StillValid {
                expires_at_epoch_millis: state.expires_at_epoch_millis,
            });
        }

        let exchanged = self.platform.exchange_token(&state.token).await?;
        let lifetime = exchanged.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS);
        let expires_at_epoch_millis = expiry_from(now, lifetime).ok_or_else(|| {
            RefreshError::Malformed(format!("exchanged token lifetime {}s is out of range", lifetime))
        })?;
        let renewed = AccessTokenState {
            token: exchanged.access_token,
            expires_at_epoch_millis,
            version: state.version + 1,
        };
        save_token(self.store.as_ref(), &renewed).await?;

        info!(
            "Access token refreshed (version {}, expires {:?})",
            renewed.version,
            renewed.expires_at()
        );
        Ok(RefreshOutcome::Refreshed {
            expires_at_epoch_millis: renewed.expires_at_epoch_millis,
            version: renewed.version,
        })
    }
}
