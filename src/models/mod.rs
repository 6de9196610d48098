/// Declares an integer record identifier that serializes as a bare number.
macro_rules! record_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl From<i32> for $name {
            fn from(raw: i32) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use record_id;

pub mod cdn;
pub mod delivery_service;
pub mod fleet;
pub mod patch;
pub mod tenant;

pub use cdn::{Cdn, CdnId, CdnUpdate, NewCdn};
pub use delivery_service::{
    DeliveryService, DeliveryServiceId, DeliveryServiceUpdate, DsType, NewDeliveryService,
};
pub use fleet::{CacheGroup, Fleet, NodeType, Server, Topology};
pub use patch::Patch;
pub use tenant::{NewTenant, Tenant, TenantId, TenantUpdate, TenantView, ROOT_TENANT_ID};
