#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};

use cdn_tenancy_core::concurrency::{ManualClock, WritePreconditions};
use cdn_tenancy_core::models::{
    CdnId, DeliveryServiceId, DsType, NewCdn, NewDeliveryService, NewTenant, NodeType, Server,
    TenantId, TenantUpdate, Topology, ROOT_TENANT_ID,
};
use cdn_tenancy_core::services::{CoreServices, RequestContext};
use cdn_tenancy_core::store::MemoryStore;

pub const MSO_TOPOLOGY: &str = "mso-topology";
pub const EDGE_ONLY_TOPOLOGY: &str = "edge-only";

/// A small CDN fleet:
///
/// ```text
/// root ── tenant1 ── tenant2 ── tenant3
///      └─ tenant4
/// ```
///
/// ds1/ds2/ds3 belong to tenant1/tenant2/tenant3 on cdn1. Cache groups
/// `cachegroup1` (edge) and `cachegroup2` (mid) have servers in both CDNs;
/// `originCachegroup` and `multiOriginCachegroup` hold ORG servers in cdn1.
pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub services: CoreServices,
    tenants: BTreeMap<String, TenantId>,
    cdns: BTreeMap<String, CdnId>,
    delivery_services: BTreeMap<String, DeliveryServiceId>,
}

impl Fixture {
    pub async fn seed() -> Result<Self> {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()));
        let store = Arc::new(MemoryStore::new(clock.clone(), "root", Duration::microseconds(1)));
        let services = CoreServices::with_max_depth(store.clone(), 64);

        let mut fixture = Self {
            clock,
            store,
            services,
            tenants: BTreeMap::from([("root".to_string(), ROOT_TENANT_ID)]),
            cdns: BTreeMap::new(),
            delivery_services: BTreeMap::new(),
        };

        for (name, parent) in [
            ("tenant1", "root"),
            ("tenant2", "tenant1"),
            ("tenant3", "tenant2"),
            ("tenant4", "root"),
        ] {
            let created = fixture
                .services
                .tenants
                .create(
                    &fixture.as_root(),
                    NewTenant {
                        name: name.to_string(),
                        parent_id: fixture.tenant(parent),
                        active: true,
                    },
                )
                .await?;
            fixture.tenants.insert(name.to_string(), created.tenant.id);
        }

        for name in ["cdn1", "cdn2"] {
            let created = fixture
                .services
                .cdns
                .create(
                    &fixture.as_root(),
                    NewCdn {
                        name: name.to_string(),
                        domain_name: format!("{}.test.example", name),
                        dnssec_enabled: false,
                    },
                )
                .await?;
            fixture.cdns.insert(name.to_string(), created.id);
        }

        fixture.seed_fleet().await?;

        for (xml_id, tenant, ds_type) in [
            ("ds1", "tenant1", DsType::Http),
            ("ds2", "tenant2", DsType::Http),
            ("ds3", "tenant3", DsType::Dns),
        ] {
            let created = fixture
                .services
                .delivery_services
                .create(
                    &fixture.as_root(),
                    new_ds(xml_id, fixture.tenant(tenant), fixture.cdn("cdn1"), ds_type),
                )
                .await?;
            fixture.delivery_services.insert(xml_id.to_string(), created.id);
        }

        Ok(fixture)
    }

    async fn seed_fleet(&self) -> Result<()> {
        for (name, node_type) in [
            ("cachegroup1", NodeType::Ordinary),
            ("cachegroup2", NodeType::Ordinary),
            ("originCachegroup", NodeType::Org),
            ("multiOriginCachegroup", NodeType::Org),
        ] {
            self.store.add_cache_group(name, node_type).await?;
        }

        for (host, cache_group, cdn, node_type, capabilities) in [
            ("atlanta-edge-01", "cachegroup1", "cdn1", NodeType::Ordinary, vec!["RAM"]),
            ("atlanta-mid-01", "cachegroup2", "cdn1", NodeType::Ordinary, vec![]),
            ("atlanta-org-1", "originCachegroup", "cdn1", NodeType::Org, vec![]),
            ("atlanta-org-2", "multiOriginCachegroup", "cdn1", NodeType::Org, vec![]),
            ("denver-edge-01", "cachegroup1", "cdn2", NodeType::Ordinary, vec![]),
            ("denver-mid-01", "cachegroup2", "cdn2", NodeType::Ordinary, vec!["DISK"]),
        ] {
            self.store
                .add_server(Server {
                    host_name: host.to_string(),
                    cache_group: cache_group.to_string(),
                    cdn_id: self.cdn(cdn),
                    node_type,
                    capabilities: capabilities.into_iter().map(String::from).collect::<BTreeSet<_>>(),
                })
                .await?;
        }

        self.store
            .add_topology(Topology {
                name: MSO_TOPOLOGY.to_string(),
                description: "edge, mid and origin tiers".to_string(),
                cache_groups: vec![
                    "cachegroup1".to_string(),
                    "cachegroup2".to_string(),
                    "originCachegroup".to_string(),
                ],
            })
            .await?;
        self.store
            .add_topology(Topology {
                name: EDGE_ONLY_TOPOLOGY.to_string(),
                description: "single tier".to_string(),
                cache_groups: vec!["cachegroup1".to_string()],
            })
            .await?;
        Ok(())
    }

    pub fn as_root(&self) -> RequestContext {
        RequestContext::new(ROOT_TENANT_ID)
    }

    pub fn as_tenant(&self, name: &str) -> RequestContext {
        RequestContext::new(self.tenant(name))
    }

    pub fn tenant(&self, name: &str) -> TenantId {
        self.tenants[name]
    }

    pub fn cdn(&self, name: &str) -> CdnId {
        self.cdns[name]
    }

    pub fn ds(&self, xml_id: &str) -> DeliveryServiceId {
        self.delivery_services[xml_id]
    }

    /// Lets the clock move so subsequent writes land in a later second
    pub fn tick(&self, seconds: i64) {
        self.clock.advance(Duration::seconds(seconds));
    }

    pub async fn set_tenant_active(&self, name: &str, active: bool) -> Result<()> {
        self.services
            .tenants
            .update(
                &self.as_root(),
                self.tenant(name),
                TenantUpdate {
                    active: Some(active),
                    ..TenantUpdate::default()
                },
                &WritePreconditions::default(),
            )
            .await
            .with_context(|| format!("failed to set {} active={}", name, active))?;
        Ok(())
    }
}

pub fn new_ds(xml_id: &str, tenant: TenantId, cdn: CdnId, ds_type: DsType) -> NewDeliveryService {
    NewDeliveryService {
        xml_id: Some(xml_id.to_string()),
        display_name: format!("{} display", xml_id),
        active: true,
        tenant_id: tenant,
        cdn_id: cdn,
        ds_type,
        routing_name: "cdn".to_string(),
        org_server_fqdn: Some(format!("http://origin.{}.example", xml_id)),
        long_desc: Some(format!("{} long description", xml_id)),
        logs_enabled: false,
        max_dns_answers: None,
        max_origin_connections: None,
        max_request_header_bytes: None,
        match_list: Some(vec![format!(".*\\.{}\\..*", xml_id)]),
        topology: None,
        first_header_rewrite: None,
        inner_header_rewrite: None,
        last_header_rewrite: None,
        edge_header_rewrite: None,
        mid_header_rewrite: None,
        required_capabilities: BTreeSet::new(),
    }
}
