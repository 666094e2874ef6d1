use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mirror root collection holding Business Manager documents.
pub const BM_COLLECTION: &str = "meta_business_managers";

/// Levels of the mirrored ads hierarchy, plus the insights leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncLevel {
    Bm,
    AdAccount,
    Campaign,
    AdGroup,
    Insights,
}

impl SyncLevel {
    pub const ALL: [SyncLevel; 5] = [
        SyncLevel::Bm,
        SyncLevel::AdAccount,
        SyncLevel::Campaign,
        SyncLevel::AdGroup,
        SyncLevel::Insights,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncLevel::Bm => "BM",
            SyncLevel::AdAccount => "AD_ACCOUNT",
            SyncLevel::Campaign => "CAMPAIGN",
            SyncLevel::AdGroup => "AD_GROUP",
            SyncLevel::Insights => "INSIGHTS",
        }
    }

    /// Human label used in messages and logs
    pub fn label(&self) -> &'static str {
        match self {
            SyncLevel::Bm => "Business Manager",
            SyncLevel::AdAccount => "ad account",
            SyncLevel::Campaign => "campaign",
            SyncLevel::AdGroup => "ad group",
            SyncLevel::Insights => "insights",
        }
    }

    /// Subcollection name under the parent document
    pub fn collection_segment(&self) -> &'static str {
        match self {
            SyncLevel::Bm => BM_COLLECTION,
            SyncLevel::AdAccount => "ad_accounts",
            SyncLevel::Campaign => "campaigns",
            SyncLevel::AdGroup => "ad_groups",
            SyncLevel::Insights => "insights",
        }
    }
}

impl fmt::Display for SyncLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown sync level '{}'", s))
    }
}

/// Mirror paths for each level, built from the resolved document keys.
pub struct MirrorPath;

impl MirrorPath {
    pub fn business_managers() -> String {
        BM_COLLECTION.to_string()
    }

    pub fn ad_accounts(bm_key: &str) -> String {
        format!("{}/{}/{}", BM_COLLECTION, bm_key, SyncLevel::AdAccount.collection_segment())
    }

    pub fn campaigns(bm_key: &str, ad_account_key: &str) -> String {
        format!(
            "{}/{}/{}",
            Self::ad_accounts(bm_key),
            ad_account_key,
            SyncLevel::Campaign.collection_segment()
        )
    }

    pub fn ad_groups(bm_key: &str, ad_account_key: &str, campaign_key: &str) -> String {
        format!(
            "{}/{}/{}",
            Self::campaigns(bm_key, ad_account_key),
            campaign_key,
            SyncLevel::AdGroup.collection_segment()
        )
    }

    pub fn insights(bm_key: &str, ad_account_key: &str) -> String {
        format!(
            "{}/{}/{}",
            Self::ad_accounts(bm_key),
            ad_account_key,
            SyncLevel::Insights.collection_segment()
        )
    }
}
