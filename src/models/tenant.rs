use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_id;

record_id!(TenantId);

/// Identifier the bootstrap root tenant is always created with.
pub const ROOT_TENANT_ID: TenantId = TenantId(1);

/// A node of the tenant hierarchy. The root's `parent_id` is its own id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub active: bool,
    pub parent_id: TenantId,
    pub last_updated: DateTime<Utc>,
}

impl Tenant {
    pub fn is_root(&self) -> bool {
        self.parent_id == self.id
    }
}

/// Tenant as returned to callers, with the parent's name resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantView {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub parent_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTenant {
    pub name: String,
    pub parent_id: TenantId,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Tenant update payload; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub parent_id: Option<TenantId>,
    pub active: Option<bool>,
}

impl TenantUpdate {
    /// Builds an update that reasserts every field of `tenant`, the way a
    /// client PUTs back an object it fetched.
    pub fn from_tenant(tenant: &Tenant) -> Self {
        Self {
            name: Some(tenant.name.clone()),
            parent_id: Some(tenant.parent_id),
            active: Some(tenant.active),
        }
    }
}
