use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::cdn::CdnId;
use super::patch::Patch;
use super::record_id;
use super::tenant::TenantId;

record_id!(DeliveryServiceId);

/// Routing type of a Delivery Service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DsType {
    Http,
    HttpNoCache,
    HttpLive,
    HttpLiveNatnl,
    Dns,
    DnsLive,
    DnsLiveNatnl,
    AnyMap,
    Steering,
    ClientSteering,
}

impl DsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DsType::Http => "HTTP",
            DsType::HttpNoCache => "HTTP_NO_CACHE",
            DsType::HttpLive => "HTTP_LIVE",
            DsType::HttpLiveNatnl => "HTTP_LIVE_NATNL",
            DsType::Dns => "DNS",
            DsType::DnsLive => "DNS_LIVE",
            DsType::DnsLiveNatnl => "DNS_LIVE_NATNL",
            DsType::AnyMap => "ANY_MAP",
            DsType::Steering => "STEERING",
            DsType::ClientSteering => "CLIENT_STEERING",
        }
    }
}

impl fmt::Display for DsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryService {
    pub id: DeliveryServiceId,
    #[serde(rename = "xmlId")]
    pub xml_id: String,
    pub display_name: String,
    pub active: bool,
    pub tenant_id: TenantId,
    #[serde(rename = "cdnId")]
    pub cdn_id: CdnId,
    #[serde(rename = "type")]
    pub ds_type: DsType,
    pub routing_name: String,
    pub org_server_fqdn: Option<String>,
    pub long_desc: Option<String>,
    pub logs_enabled: bool,
    #[serde(rename = "maxDNSAnswers")]
    pub max_dns_answers: Option<i32>,
    pub max_origin_connections: Option<i32>,
    pub max_request_header_bytes: Option<i32>,
    pub match_list: Option<Vec<String>>,
    pub topology: Option<String>,
    pub first_header_rewrite: Option<String>,
    pub inner_header_rewrite: Option<String>,
    pub last_header_rewrite: Option<String>,
    pub edge_header_rewrite: Option<String>,
    pub mid_header_rewrite: Option<String>,
    pub required_capabilities: BTreeSet<String>,
    /// Host names of servers assigned directly to this Delivery Service
    pub assigned_servers: BTreeSet<String>,
    /// Set once SSL key material has been provisioned for this Delivery Service
    pub ssl_key_version: Option<i32>,
    pub last_updated: DateTime<Utc>,
}

impl DeliveryService {
    pub fn has_ssl_keys(&self) -> bool {
        self.ssl_key_version.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeliveryService {
    #[serde(rename = "xmlId")]
    pub xml_id: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub active: bool,
    pub tenant_id: TenantId,
    #[serde(rename = "cdnId")]
    pub cdn_id: CdnId,
    #[serde(rename = "type")]
    pub ds_type: DsType,
    #[serde(default = "default_routing_name")]
    pub routing_name: String,
    #[serde(default)]
    pub org_server_fqdn: Option<String>,
    #[serde(default)]
    pub long_desc: Option<String>,
    #[serde(default)]
    pub logs_enabled: bool,
    #[serde(default, rename = "maxDNSAnswers")]
    pub max_dns_answers: Option<i32>,
    #[serde(default)]
    pub max_origin_connections: Option<i32>,
    #[serde(default)]
    pub max_request_header_bytes: Option<i32>,
    #[serde(default)]
    pub match_list: Option<Vec<String>>,
    #[serde(default)]
    pub topology: Option<String>,
    #[serde(default)]
    pub first_header_rewrite: Option<String>,
    #[serde(default)]
    pub inner_header_rewrite: Option<String>,
    #[serde(default)]
    pub last_header_rewrite: Option<String>,
    #[serde(default)]
    pub edge_header_rewrite: Option<String>,
    #[serde(default)]
    pub mid_header_rewrite: Option<String>,
    #[serde(default)]
    pub required_capabilities: BTreeSet<String>,
}

fn default_routing_name() -> String {
    "cdn".to_string()
}

impl NewDeliveryService {
    /// Materializes the record the store will persist. Id and stamp are
    /// placeholders replaced on insert.
    pub fn into_record(self, xml_id: String) -> DeliveryService {
        DeliveryService {
            id: DeliveryServiceId(0),
            xml_id,
            display_name: self.display_name,
            active: self.active,
            tenant_id: self.tenant_id,
            cdn_id: self.cdn_id,
            ds_type: self.ds_type,
            routing_name: self.routing_name,
            org_server_fqdn: self.org_server_fqdn,
            long_desc: self.long_desc,
            logs_enabled: self.logs_enabled,
            max_dns_answers: self.max_dns_answers,
            max_origin_connections: self.max_origin_connections,
            max_request_header_bytes: self.max_request_header_bytes,
            match_list: self.match_list,
            topology: self.topology,
            first_header_rewrite: self.first_header_rewrite,
            inner_header_rewrite: self.inner_header_rewrite,
            last_header_rewrite: self.last_header_rewrite,
            edge_header_rewrite: self.edge_header_rewrite,
            mid_header_rewrite: self.mid_header_rewrite,
            required_capabilities: self.required_capabilities,
            assigned_servers: BTreeSet::new(),
            ssl_key_version: None,
            last_updated: DateTime::<Utc>::default(),
        }
    }
}

/// Delivery Service update payload.
///
/// Required fields are plain `Option`s (absent keeps the stored value).
/// Nullable fields are `Patch`es so that an explicit `null` clears the
/// stored value while an absent key leaves it alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryServiceUpdate {
    pub display_name: Option<String>,
    pub active: Option<bool>,
    pub tenant_id: Option<TenantId>,
    #[serde(rename = "cdnId")]
    pub cdn_id: Option<CdnId>,
    #[serde(rename = "type")]
    pub ds_type: Option<DsType>,
    pub routing_name: Option<String>,
    pub logs_enabled: Option<bool>,
    #[serde(default)]
    pub org_server_fqdn: Patch<String>,
    #[serde(default)]
    pub long_desc: Patch<String>,
    #[serde(default, rename = "maxDNSAnswers")]
    pub max_dns_answers: Patch<i32>,
    #[serde(default)]
    pub max_origin_connections: Patch<i32>,
    #[serde(default)]
    pub max_request_header_bytes: Patch<i32>,
    #[serde(default)]
    pub match_list: Patch<Vec<String>>,
    #[serde(default)]
    pub topology: Patch<String>,
    #[serde(default)]
    pub first_header_rewrite: Patch<String>,
    #[serde(default)]
    pub inner_header_rewrite: Patch<String>,
    #[serde(default)]
    pub last_header_rewrite: Patch<String>,
    #[serde(default)]
    pub edge_header_rewrite: Patch<String>,
    #[serde(default)]
    pub mid_header_rewrite: Patch<String>,
}

impl DeliveryServiceUpdate {
    /// Applies the update to a copy of the stored record.
    pub fn apply(self, current: &DeliveryService) -> DeliveryService {
        let mut next = current.clone();

        if let Some(v) = self.display_name {
            next.display_name = v;
        }
        if let Some(v) = self.active {
            next.active = v;
        }
        if let Some(v) = self.tenant_id {
            next.tenant_id = v;
        }
        if let Some(v) = self.cdn_id {
            next.cdn_id = v;
        }
        if let Some(v) = self.ds_type {
            next.ds_type = v;
        }
        if let Some(v) = self.routing_name {
            next.routing_name = v;
        }
        if let Some(v) = self.logs_enabled {
            next.logs_enabled = v;
        }

        self.org_server_fqdn.apply_to(&mut next.org_server_fqdn);
        self.long_desc.apply_to(&mut next.long_desc);
        self.max_dns_answers.apply_to(&mut next.max_dns_answers);
        self.max_origin_connections
            .apply_to(&mut next.max_origin_connections);
        self.max_request_header_bytes
            .apply_to(&mut next.max_request_header_bytes);
        self.match_list.apply_to(&mut next.match_list);
        self.topology.apply_to(&mut next.topology);
        self.first_header_rewrite
            .apply_to(&mut next.first_header_rewrite);
        self.inner_header_rewrite
            .apply_to(&mut next.inner_header_rewrite);
        self.last_header_rewrite.apply_to(&mut next.last_header_rewrite);
        self.edge_header_rewrite.apply_to(&mut next.edge_header_rewrite);
        self.mid_header_rewrite.apply_to(&mut next.mid_header_rewrite);

        next
    }
}
