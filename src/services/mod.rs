pub mod cdn_service;
pub mod context;
pub mod ds_service;
pub mod tenant_service;

use std::sync::Arc;

use crate::store::ResourceStore;

pub use cdn_service::CdnService;
pub use context::RequestContext;
pub use ds_service::{DeliveryServiceQuery, DeliveryServiceService};
pub use tenant_service::TenantService;

/// The three resource services over one shared store.
pub struct CoreServices {
    pub tenants: TenantService,
    pub delivery_services: DeliveryServiceService,
    pub cdns: CdnService,
}

impl CoreServices {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self::with_max_depth(store, crate::config::config().tenancy.max_depth)
    }

    pub fn with_max_depth(store: Arc<dyn ResourceStore>, max_depth: usize) -> Self {
        Self {
            tenants: TenantService::with_max_depth(store.clone(), max_depth),
            delivery_services: DeliveryServiceService::with_max_depth(store.clone(), max_depth),
            cdns: CdnService::with_max_depth(store, max_depth),
        }
    }
}
