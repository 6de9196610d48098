// Domain error taxonomy for authorization and consistency decisions
use thiserror::Error;

use crate::models::{CdnId, DsType, TenantId};
use crate::store::StoreError;

/// Every denial the core can produce. Each variant is scoped to one request
/// and none is retried internally.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Tenant {tenant} is inactive")]
    TenantInactive { tenant: TenantId },

    #[error("Not authorized to access this resource")]
    Forbidden,

    #[error("Tenant {parent} is in the subtree of tenant {tenant} and cannot become its parent")]
    Cycle { tenant: TenantId, parent: TenantId },

    #[error("The root tenant cannot be modified, reparented or deleted")]
    ImmutableRoot,

    #[error("Tenant '{name}' has child tenants. Please update these child tenants and retry.")]
    HasChildren {
        tenant: TenantId,
        name: String,
        children: Vec<TenantId>,
    },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Delivery service '{xml_id}' has type {ds_type}, which cannot be assigned a topology")]
    IncompatibleType { xml_id: String, ds_type: DsType },

    #[error(
        "Topology '{topology}' has no servers in CDN {cdn} with required capabilities: {}",
        .capabilities.join(", ")
    )]
    UnsatisfiableCapability {
        topology: String,
        cdn: CdnId,
        capabilities: Vec<String>,
    },

    #[error(
        "the following ORG server cachegroups are not in the delivery service's topology ({topology}): {}",
        .cache_groups.join(", ")
    )]
    OrgCacheGroupMismatch {
        topology: String,
        cache_groups: Vec<String>,
    },

    #[error(
        "Topology '{topology}' cachegroups have no servers in CDN {cdn}: {}",
        .cache_groups.join(", ")
    )]
    EmptyCacheGroupInCdn {
        topology: String,
        cdn: CdnId,
        cache_groups: Vec<String>,
    },

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Delivery service '{xml_id}' has SSL keys provisioned; {field} cannot be changed")]
    SslKeysProvisioned { xml_id: String, field: &'static str },

    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("{kind} {key} is in use: {detail}")]
    InUse {
        kind: &'static str,
        key: String,
        detail: String,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl CoreError {
    /// Stable machine-readable code for this kind of denial
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::TenantInactive { .. } => "TENANT_INACTIVE",
            CoreError::Forbidden => "FORBIDDEN",
            CoreError::Cycle { .. } => "CYCLE",
            CoreError::ImmutableRoot => "IMMUTABLE_ROOT",
            CoreError::HasChildren { .. } => "HAS_CHILDREN",
            CoreError::PreconditionFailed(_) => "PRECONDITION_FAILED",
            CoreError::IncompatibleType { .. } => "INCOMPATIBLE_TYPE",
            CoreError::UnsatisfiableCapability { .. } => "UNSATISFIABLE_CAPABILITY",
            CoreError::OrgCacheGroupMismatch { .. } => "ORG_CACHE_GROUP_MISMATCH",
            CoreError::EmptyCacheGroupInCdn { .. } => "EMPTY_CACHE_GROUP_IN_CDN",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Validation { .. } => "VALIDATION_ERROR",
            CoreError::SslKeysProvisioned { .. } => "SSL_KEYS_PROVISIONED",
            CoreError::AlreadyExists { .. } => "ALREADY_EXISTS",
            CoreError::InUse { .. } => "IN_USE",
            CoreError::Store(_) => "STORE_ERROR",
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        CoreError::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}

// A lost compare-and-swap is the same outcome as a stale If-Match
impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, key } => CoreError::NotFound { kind, key },
            StoreError::Conflict { kind, key } => CoreError::PreconditionFailed(format!(
                "{} {} was modified by another request",
                kind, key
            )),
            StoreError::Duplicate { kind, key } => CoreError::AlreadyExists { kind, name: key },
            StoreError::HasChildren { id, name, children, .. } => CoreError::HasChildren {
                tenant: TenantId(id),
                name,
                children: children.into_iter().map(TenantId).collect(),
            },
            StoreError::Invalid { field, message, .. } => CoreError::validation(field, message),
            other => CoreError::Store(other),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
