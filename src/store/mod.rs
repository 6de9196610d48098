pub mod error;
pub mod memory;
pub mod repository;

use async_trait::async_trait;

use crate::models::{Cdn, DeliveryService, Fleet, Tenant};

pub use error::StoreError;
pub use memory::MemoryStore;
pub use repository::{Repository, StoredRecord, Table};

/// Persistence collaborator the services are written against.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    fn tenants(&self) -> &dyn Repository<Tenant>;

    fn delivery_services(&self) -> &dyn Repository<DeliveryService>;

    fn cdns(&self) -> &dyn Repository<Cdn>;

    /// Current snapshot of topologies, cache groups and servers
    async fn fleet(&self) -> Result<Fleet, StoreError>;
}
