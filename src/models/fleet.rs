use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::cdn::CdnId;

/// Role tag carried by cache groups and servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Ordinary,
    Org,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheGroup {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub host_name: String,
    pub cache_group: String,
    #[serde(rename = "cdnId")]
    pub cdn_id: CdnId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub capabilities: BTreeSet<String>,
}

impl Server {
    pub fn is_org(&self) -> bool {
        self.node_type == NodeType::Org
    }
}

/// A named, ordered collection of cache groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    pub name: String,
    pub description: String,
    pub cache_groups: Vec<String>,
}

impl Topology {
    pub fn contains_cache_group(&self, name: &str) -> bool {
        self.cache_groups.iter().any(|cg| cg == name)
    }
}

/// Snapshot of the serving inventory that topology decisions are made against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fleet {
    pub cache_groups: BTreeMap<String, CacheGroup>,
    pub servers: BTreeMap<String, Server>,
    pub topologies: BTreeMap<String, Topology>,
}

impl Fleet {
    pub fn topology(&self, name: &str) -> Option<&Topology> {
        self.topologies.get(name)
    }

    pub fn server(&self, host_name: &str) -> Option<&Server> {
        self.servers.get(host_name)
    }

    /// Members of `cache_group` that belong to `cdn`.
    pub fn servers_in<'a>(
        &'a self,
        cache_group: &'a str,
        cdn: CdnId,
    ) -> impl Iterator<Item = &'a Server> + 'a {
        self.servers
            .values()
            .filter(move |s| s.cache_group == cache_group && s.cdn_id == cdn)
    }

    pub fn cdn_has_servers(&self, cdn: CdnId) -> bool {
        self.servers.values().any(|s| s.cdn_id == cdn)
    }
}
