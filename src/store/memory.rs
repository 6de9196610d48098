use async_trait::async_trait;
use chrono::Duration;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::StoreError;
use super::repository::{Repository, Table};
use super::ResourceStore;
use crate::concurrency::{Clock, SystemClock};
use crate::config::config;
use crate::models::{
    CacheGroup, Cdn, CdnId, DeliveryService, Fleet, NodeType, Server, Tenant, Topology,
    ROOT_TENANT_ID,
};

/// In-process store. Starts with only the root tenant.
pub struct MemoryStore {
    tenants: Table<Tenant>,
    delivery_services: Table<DeliveryService>,
    cdns: Table<Cdn>,
    fleet: RwLock<Fleet>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>, root_tenant_name: &str, min_advance: Duration) -> Self {
        let root = Tenant {
            id: ROOT_TENANT_ID,
            name: root_tenant_name.to_string(),
            active: true,
            parent_id: ROOT_TENANT_ID,
            last_updated: clock.now(),
        };

        tracing::info!("Bootstrapping store with root tenant '{}'", root_tenant_name);

        Self {
            tenants: Table::seeded(vec![root], clock.clone(), min_advance),
            delivery_services: Table::new(clock.clone(), min_advance),
            cdns: Table::new(clock, min_advance),
            fleet: RwLock::new(Fleet::default()),
        }
    }

    /// Store configured from the process-wide settings, on the system clock
    pub fn from_config() -> Self {
        let settings = config();
        Self::new(
            Arc::new(SystemClock),
            &settings.tenancy.root_tenant_name,
            Duration::microseconds(settings.concurrency.min_advance_micros),
        )
    }

    pub async fn add_cache_group(&self, name: &str, node_type: NodeType) -> Result<(), StoreError> {
        let mut fleet = self.fleet.write().await;
        if fleet.cache_groups.contains_key(name) {
            return Err(StoreError::Duplicate {
                kind: "cachegroup",
                key: name.to_string(),
            });
        }
        fleet.cache_groups.insert(
            name.to_string(),
            CacheGroup {
                name: name.to_string(),
                node_type,
            },
        );
        Ok(())
    }

    pub async fn add_server(&self, server: Server) -> Result<(), StoreError> {
        let mut fleet = self.fleet.write().await;
        let cache_group = fleet
            .cache_groups
            .get(&server.cache_group)
            .ok_or_else(|| StoreError::NotFound {
                kind: "cachegroup",
                key: server.cache_group.clone(),
            })?;
        if cache_group.node_type != server.node_type {
            return Err(StoreError::Invalid {
                kind: "server",
                key: server.host_name.clone(),
                field: "type",
                message: format!(
                    "{:?} server cannot join {:?} cache group '{}'",
                    server.node_type, cache_group.node_type, cache_group.name
                ),
            });
        }
        if fleet.servers.contains_key(&server.host_name) {
            return Err(StoreError::Duplicate {
                kind: "server",
                key: server.host_name.clone(),
            });
        }
        fleet.servers.insert(server.host_name.clone(), server);
        Ok(())
    }

    /// Moves a server to another CDN, which can leave its cache group empty for the old one.
    pub async fn move_server_to_cdn(&self, host_name: &str, cdn: CdnId) -> Result<(), StoreError> {
        let mut fleet = self.fleet.write().await;
        let server = fleet
            .servers
            .get_mut(host_name)
            .ok_or_else(|| StoreError::NotFound {
                kind: "server",
                key: host_name.to_string(),
            })?;
        tracing::info!("Moving server {} from CDN {} to CDN {}", host_name, server.cdn_id, cdn);
        server.cdn_id = cdn;
        Ok(())
    }

    pub async fn set_server_capabilities(
        &self,
        host_name: &str,
        capabilities: BTreeSet<String>,
    ) -> Result<(), StoreError> {
        let mut fleet = self.fleet.write().await;
        let server = fleet
            .servers
            .get_mut(host_name)
            .ok_or_else(|| StoreError::NotFound {
                kind: "server",
                key: host_name.to_string(),
            })?;
        server.capabilities = capabilities;
        Ok(())
    }

    pub async fn add_topology(&self, topology: Topology) -> Result<(), StoreError> {
        let mut fleet = self.fleet.write().await;
        if fleet.topologies.contains_key(&topology.name) {
            return Err(StoreError::Duplicate {
                kind: "topology",
                key: topology.name.clone(),
            });
        }
        if let Some(missing) = topology
            .cache_groups
            .iter()
            .find(|cg| !fleet.cache_groups.contains_key(cg.as_str()))
        {
            return Err(StoreError::NotFound {
                kind: "cachegroup",
                key: missing.clone(),
            });
        }
        fleet.topologies.insert(topology.name.clone(), topology);
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    fn tenants(&self) -> &dyn Repository<Tenant> {
        &self.tenants
    }

    fn delivery_services(&self) -> &dyn Repository<DeliveryService> {
        &self.delivery_services
    }

    fn cdns(&self) -> &dyn Repository<Cdn> {
        &self.cdns
    }

    async fn fleet(&self) -> Result<Fleet, StoreError> {
        Ok(self.fleet.read().await.clone())
    }
}
