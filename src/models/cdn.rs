use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_id;

record_id!(CdnId);

/// A CDN. CDNs carry no owning tenant and are visible to every active requester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cdn {
    pub id: CdnId,
    pub name: String,
    pub domain_name: String,
    #[serde(rename = "dnssecEnabled")]
    pub dnssec_enabled: bool,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCdn {
    pub name: String,
    pub domain_name: String,
    #[serde(default, rename = "dnssecEnabled")]
    pub dnssec_enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnUpdate {
    pub name: Option<String>,
    pub domain_name: Option<String>,
    #[serde(rename = "dnssecEnabled")]
    pub dnssec_enabled: Option<bool>,
}
