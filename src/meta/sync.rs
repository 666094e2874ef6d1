// Hierarchical ads-data synchronization
//
// Business Manager -> Ad Account -> Campaign -> Ad Group, plus daily insights
// per ad account. Each level lists one parent's children from the platform and
// replaces the mirrored children wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AncestorPolicy, MetaConfig, ReplaceStrategy};
use crate::database::{Document, DocumentStore, StoreError, WriteBatch};

use super::client::{AdsPlatform, GraphRequest, PlatformError};
use super::insights::{aggregate_rows, is_valid_date, yesterday_utc, INSIGHT_FIELDS};
use super::level::{MirrorPath, SyncLevel};
use super::sanitize::{id_field, sanitize_item, sanitize_key};
use super::token::{load_token, RefreshError};

const BM_FIELDS: &[&str] = &["id", "name", "verification_status", "created_time"];
const AD_ACCOUNT_FIELDS: &[&str] = &[
    "id",
    "account_id",
    "name",
    "account_status",
    "currency",
    "timezone_name",
    "amount_spent",
    "balance",
    "business",
];
const CAMPAIGN_FIELDS: &[&str] = &[
    "id",
    "name",
    "status",
    "effective_status",
    "objective",
    "daily_budget",
    "lifetime_budget",
    "start_time",
    "stop_time",
];
const AD_GROUP_FIELDS: &[&str] = &[
    "id",
    "name",
    "status",
    "effective_status",
    "daily_budget",
    "lifetime_budget",
    "optimization_goal",
    "billing_event",
    "start_time",
    "end_time",
];
const LISTED_STATUSES: &str = r#"["ACTIVE","PAUSED"]"#;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{label} '{value}' matches {count} mirror documents")]
    Ambiguous {
        label: &'static str,
        value: String,
        count: usize,
    },

    #[error("no ads platform access token is configured")]
    NoAccessToken,

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RefreshError> for SyncError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Store(e) => SyncError::Store(e),
            RefreshError::Platform(e) => SyncError::Platform(e),
            RefreshError::Malformed(msg) => SyncError::Store(StoreError::QueryError(msg)),
        }
    }
}

/// Entry-point arguments. Which parent keys are required depends on `level`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub level: Option<SyncLevel>,
    pub bm_id: Option<String>,
    pub ad_account_key: Option<String>,
    pub campaign_key: Option<String>,
    pub date: Option<String>,
}

impl SyncRequest {
    pub fn new(level: SyncLevel) -> Self {
        Self {
            level: Some(level),
            ..Default::default()
        }
    }

    pub fn bm(mut self, bm_id: impl Into<String>) -> Self {
        self.bm_id = Some(bm_id.into());
        self
    }

    pub fn ad_account(mut self, key: impl Into<String>) -> Self {
        self.ad_account_key = Some(key.into());
        self
    }

    pub fn campaign(mut self, key: impl Into<String>) -> Self {
        self.campaign_key = Some(key.into());
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// Two listed items whose names sanitize to the same document key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCollision {
    pub key: String,
    pub overwritten_id: String,
    pub winning_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub message: String,
    pub level: SyncLevel,
    pub count: usize,
    pub skipped: usize,
    pub collisions: Vec<KeyCollision>,
}

/// Result of resolving an ancestor by platform id
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Document),
    Missing,
    Ambiguous(Vec<Document>),
}

impl LookupOutcome {
    pub fn from_matches(mut matches: Vec<Document>) -> Self {
        match matches.len() {
            0 => LookupOutcome::Missing,
            1 => LookupOutcome::Found(matches.remove(0)),
            _ => LookupOutcome::Ambiguous(matches),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub bm_list_limit: u32,
    pub ad_account_list_limit: u32,
    pub ancestor_policy: AncestorPolicy,
    pub replace_strategy: ReplaceStrategy,
}

impl From<&MetaConfig> for SyncSettings {
    fn from(config: &MetaConfig) -> Self {
        Self {
            bm_list_limit: config.bm_list_limit,
            ad_account_list_limit: config.ad_account_list_limit,
            ancestor_policy: config.ancestor_policy,
            replace_strategy: config.replace_strategy,
        }
    }
}

/// A mirror document resolved on the way down: its key and platform id.
#[derive(Debug, Clone)]
struct Resolved {
    key: String,
    external_id: String,
}

#[derive(Debug, Default)]
struct ReplaceReport {
    count: usize,
    skipped: usize,
    collisions: Vec<KeyCollision>,
}

pub struct AdsSyncService {
    store: Arc<dyn DocumentStore>,
    platform: Arc<dyn AdsPlatform>,
    settings: SyncSettings,
}

impl AdsSyncService {
    pub fn new(store: Arc<dyn DocumentStore>, platform: Arc<dyn AdsPlatform>, settings: SyncSettings) -> Self {
        Self {
            store,
            platform,
            settings,
        }
    }

    /// Synchronize one level of the mirror under the given parents.
    pub async fn sync(&self, request: SyncRequest) -> Result<SyncOutcome, SyncError> {
        self.sync_at(request, Utc::now()).await
    }

    /// Same as [`Self::sync`] with an explicit clock for the insights default date.
    pub async fn sync_at(&self, request: SyncRequest, now: DateTime<Utc>) -> Result<SyncOutcome, SyncError> {
        let level = request
            .level
            .ok_or_else(|| SyncError::InvalidArgument("level is required".to_string()))?;

        // Argument checks come first so bad requests never touch the store
        let bm_id = match level {
            SyncLevel::Bm => None,
            _ => Some(required(&request.bm_id, "bmId")?),
        };
        let ad_account_key = match level {
            SyncLevel::Campaign | SyncLevel::AdGroup | SyncLevel::Insights => {
                Some(required(&request.ad_account_key, "adAccountKey")?)
            }
            _ => None,
        };
        let campaign_key = match level {
            SyncLevel::AdGroup => Some(required(&request.campaign_key, "campaignKey")?),
            _ => None,
        };
        let date = match (level, request.date.as_deref()) {
            (SyncLevel::Insights, Some(date)) if !is_valid_date(date) => {
                return Err(SyncError::InvalidArgument(format!(
                    "date '{}' must be formatted YYYY-MM-DD",
                    date
                )));
            }
            (SyncLevel::Insights, Some(date)) => date.to_string(),
            (SyncLevel::Insights, None) => yesterday_utc(now),
            _ => String::new(),
        };

        let token = load_token(self.store.as_ref())
            .await?
            .ok_or(SyncError::NoAccessToken)?
            .token;

        match level {
            SyncLevel::Bm => self.sync_business_managers(&token).await,
            SyncLevel::AdAccount => {
                let bm = self.resolve_bm(bm_id.unwrap_or_default()).await?;
                self.sync_ad_accounts(&token, &bm).await
            }
            SyncLevel::Campaign => {
                let bm = self.resolve_bm(bm_id.unwrap_or_default()).await?;
                let account = self
                    .resolve_child(&MirrorPath::ad_accounts(&bm.key), ad_account_key.unwrap_or_default(), SyncLevel::AdAccount)
                    .await?;
                self.sync_campaigns(&token, &bm, &account).await
            }
            SyncLevel::AdGroup => {
                let bm = self.resolve_bm(bm_id.unwrap_or_default()).await?;
                let account = self
                    .resolve_child(&MirrorPath::ad_accounts(&bm.key), ad_account_key.unwrap_or_default(), SyncLevel::AdAccount)
                    .await?;
                let campaign = self
                    .resolve_child(
                        &MirrorPath::campaigns(&bm.key, &account.key),
                        campaign_key.unwrap_or_default(),
                        SyncLevel::Campaign,
                    )
                    .await?;
                self.sync_ad_groups(&token, &bm, &account, &campaign).await
            }
            SyncLevel::Insights => {
                let bm = self.resolve_bm(bm_id.unwrap_or_default()).await?;
                let account = self
                    .resolve_child(&MirrorPath::ad_accounts(&bm.key), ad_account_key.unwrap_or_default(), SyncLevel::AdAccount)
                    .await?;
                self.sync_insights(&token, &bm, &account, &date).await
            }
        }
    }

    async fn sync_business_managers(&self, token: &str) -> Result<SyncOutcome, SyncError> {
        let request = GraphRequest::new("me/businesses", token)
            .fields(BM_FIELDS)
            .param("limit", self.settings.bm_list_limit.to_string());
        let items = self.platform.list(request).await?;

        let report = self.replace_children(&MirrorPath::business_managers(), items).await?;
        Ok(outcome(SyncLevel::Bm, report, "the access token".to_string()))
    }

    async fn sync_ad_accounts(&self, token: &str, bm: &Resolved) -> Result<SyncOutcome, SyncError> {
        let request = GraphRequest::new(format!("{}/owned_ad_accounts", bm.external_id), token)
            .fields(AD_ACCOUNT_FIELDS)
            .param("limit", self.settings.ad_account_list_limit.to_string());
        let items = self.platform.list(request).await?;

        let report = self.replace_children(&MirrorPath::ad_accounts(&bm.key), items).await?;
        Ok(outcome(SyncLevel::AdAccount, report, format!("Business Manager {}", bm.external_id)))
    }

    async fn sync_campaigns(&self, token: &str, bm: &Resolved, account: &Resolved) -> Result<SyncOutcome, SyncError> {
        let request = GraphRequest::new(format!("{}/campaigns", account.external_id), token)
            .fields(CAMPAIGN_FIELDS)
            .param("effective_status", LISTED_STATUSES);
        let items = self.platform.list(request).await?;

        let report = self
            .replace_children(&MirrorPath::campaigns(&bm.key, &account.key), items)
            .await?;
        Ok(outcome(SyncLevel::Campaign, report, format!("ad account {}", account.key)))
    }

    async fn sync_ad_groups(
        &self,
        token: &str,
        bm: &Resolved,
        account: &Resolved,
        campaign: &Resolved,
    ) -> Result<SyncOutcome, SyncError> {
        let request = GraphRequest::new(format!("{}/adsets", campaign.external_id), token)
            .fields(AD_GROUP_FIELDS)
            .param("effective_status", LISTED_STATUSES);
        let items = self.platform.list(request).await?;

        let report = self
            .replace_children(&MirrorPath::ad_groups(&bm.key, &account.key, &campaign.key), items)
            .await?;
        Ok(outcome(SyncLevel::AdGroup, report, format!("campaign {}", campaign.key)))
    }

    async fn sync_insights(
        &self,
        token: &str,
        bm: &Resolved,
        account: &Resolved,
        date: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let time_range = json!({ "since": date, "until": date }).to_string();
        let request = GraphRequest::new(format!("{}/insights", account.external_id), token)
            .fields(INSIGHT_FIELDS)
            .param("time_range", time_range)
            .param("time_increment", "1");
        let rows = self.platform.list(request).await?;

        let mut record = sanitize_item(&aggregate_rows(&rows));
        // The requested range wins over anything the platform echoed
        record.insert("date_start".to_string(), json!(date));
        record.insert("date_stop".to_string(), json!(date));
        record.insert("adAccountId".to_string(), json!(account.external_id));
        record.insert("rowCount".to_string(), json!(rows.len()));

        self.store
            .merge(&MirrorPath::insights(&bm.key, &account.key), date, record)
            .await?;

        info!(
            "Merged insights for ad account {} on {} ({} rows)",
            account.external_id,
            date,
            rows.len()
        );
        Ok(SyncOutcome {
            message: format!("Synced insights for ad account {} on {}", account.key, date),
            level: SyncLevel::Insights,
            count: rows.len(),
            skipped: 0,
            collisions: Vec::new(),
        })
    }

    /// BM documents are keyed by name but addressed by platform id.
    async fn resolve_bm(&self, bm_id: &str) -> Result<Resolved, SyncError> {
        let matches = self
            .store
            .query_eq(&MirrorPath::business_managers(), "id", &json!(bm_id))
            .await?;

        let doc = match LookupOutcome::from_matches(matches) {
            LookupOutcome::Found(doc) => doc,
            LookupOutcome::Missing => {
                return Err(SyncError::NotFound(format!("Business Manager {} not found", bm_id)));
            }
            LookupOutcome::Ambiguous(docs) => match self.settings.ancestor_policy {
                AncestorPolicy::Reject => {
                    return Err(SyncError::Ambiguous {
                        label: SyncLevel::Bm.label(),
                        value: bm_id.to_string(),
                        count: docs.len(),
                    });
                }
                AncestorPolicy::FirstMatch => {
                    let keys: Vec<&str> = docs.iter().map(|d| d.key.as_str()).collect();
                    warn!(
                        "Business Manager {} matches {} mirror documents {:?}; using '{}'",
                        bm_id,
                        docs.len(),
                        keys,
                        keys[0]
                    );
                    docs.into_iter().next().ok_or_else(|| {
                        SyncError::NotFound(format!("Business Manager {} not found", bm_id))
                    })?
                }
            },
        };

        Ok(Resolved {
            key: doc.key,
            external_id: bm_id.to_string(),
        })
    }

    /// Deeper ancestors are addressed by their sanitized-name document key.
    async fn resolve_child(&self, collection: &str, key: &str, level: SyncLevel) -> Result<Resolved, SyncError> {
        let doc = self
            .store
            .get(collection, key)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("{} '{}' not found", level.label(), key)))?;

        let external_id = id_field(&doc.data, "id").ok_or_else(|| {
            SyncError::NotFound(format!("{} '{}' has no platform id", level.label(), key))
        })?;

        Ok(Resolved {
            key: doc.key,
            external_id,
        })
    }

    /// Delete every current child of `collection`, then insert the listing.
    async fn replace_children(
        &self,
        collection: &str,
        items: Vec<Map<String, Value>>,
    ) -> Result<ReplaceReport, SyncError> {
        let mut report = ReplaceReport::default();
        let mut inserts = WriteBatch::new();
        let mut index: HashMap<String, String> = HashMap::new();

        for item in items {
            let clean = sanitize_item(&item);
            let (Some(id), Some(name)) = (id_field(&clean, "id"), id_field(&clean, "name")) else {
                warn!("Skipping listed item without id or name under {}: {:?}", collection, item);
                report.skipped += 1;
                continue;
            };

            let key = sanitize_key(&name);
            if let Some(previous) = index.insert(key.clone(), id.clone()) {
                if previous != id {
                    warn!(
                        "Name collision under {}: '{}' maps both {} and {}; keeping {}",
                        collection, key, previous, id, id
                    );
                    report.collisions.push(KeyCollision {
                        key: key.clone(),
                        overwritten_id: previous,
                        winning_id: id.clone(),
                    });
                }
            }
            inserts.set(collection, &key, clean)?;
        }
        report.count = index.len();

        let mut deletes = WriteBatch::new();
        for doc in self.store.list(collection).await? {
            deletes.delete(collection, &doc.key)?;
        }
        let removed = deletes.len();

        match self.settings.replace_strategy {
            ReplaceStrategy::TwoBatch => {
                // Not atomic across the two commits
                self.store.commit(deletes).await?;
                self.store.commit(inserts).await?;
            }
            ReplaceStrategy::SingleBatch => {
                deletes.extend(inserts);
                self.store.commit(deletes).await?;
            }
        }

        info!(
            "Replaced {} with {} documents (removed {}, skipped {}, collisions {})",
            collection,
            report.count,
            removed,
            report.skipped,
            report.collisions.len()
        );
        Ok(report)
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, SyncError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(SyncError::InvalidArgument(format!("{} is required", field))),
    }
}

fn outcome(level: SyncLevel, report: ReplaceReport, parent: String) -> SyncOutcome {
    SyncOutcome {
        message: format!("Synced {} {} item(s) for {}", report.count, level.label(), parent),
        level,
        count: report.count,
        skipped: report.skipped,
        collisions: report.collisions,
    }
}
