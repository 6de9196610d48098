use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::CoreError;
use crate::models::{CdnId, DeliveryService, DsType, Fleet, Topology};

/// Structural checks for binding a Delivery Service to a Topology.
///
/// Every check is pure over the fleet snapshot it was built with. Callers
/// apply the assignment only after `Ok`.
pub struct TopologyValidator<'a> {
    fleet: &'a Fleet,
}

impl<'a> TopologyValidator<'a> {
    pub fn new(fleet: &'a Fleet) -> Self {
        Self { fleet }
    }

    pub fn validate_assignment(
        &self,
        ds: &DeliveryService,
        topology_name: &str,
    ) -> Result<&'a Topology, CoreError> {
        if ds.ds_type == DsType::ClientSteering {
            warn!("Rejecting topology {} for {} delivery service {}", topology_name, ds.ds_type, ds.xml_id);
            return Err(CoreError::IncompatibleType {
                xml_id: ds.xml_id.clone(),
                ds_type: ds.ds_type,
            });
        }

        let topology = self.topology(topology_name)?;

        let unsatisfied = self.unsatisfied_capabilities(topology, ds.cdn_id, &ds.required_capabilities);
        if !unsatisfied.is_empty() {
            return Err(CoreError::UnsatisfiableCapability {
                topology: topology.name.clone(),
                cdn: ds.cdn_id,
                capabilities: unsatisfied,
            });
        }

        let mut misplaced = BTreeSet::new();
        for host_name in &ds.assigned_servers {
            let server = self
                .fleet
                .server(host_name)
                .ok_or_else(|| CoreError::not_found("server", host_name))?;
            if server.is_org() && !topology.contains_cache_group(&server.cache_group) {
                misplaced.insert(server.cache_group.clone());
            }
        }
        if !misplaced.is_empty() {
            return Err(CoreError::OrgCacheGroupMismatch {
                topology: topology.name.clone(),
                cache_groups: misplaced.into_iter().collect(),
            });
        }

        let empty: Vec<String> = topology
            .cache_groups
            .iter()
            .filter(|cg| self.fleet.servers_in(cg, ds.cdn_id).next().is_none())
            .cloned()
            .collect();
        if !empty.is_empty() {
            return Err(CoreError::EmptyCacheGroupInCdn {
                topology: topology.name.clone(),
                cdn: ds.cdn_id,
                cache_groups: empty,
            });
        }

        debug!("Topology {} is valid for delivery service {}", topology.name, ds.xml_id);
        Ok(topology)
    }

    /// first/inner/last rewrites need a topology; edge/mid rewrites need its absence
    pub fn check_header_rewrites(ds: &DeliveryService) -> Result<(), CoreError> {
        let (forbidden, reason) = if ds.topology.is_some() {
            (
                [
                    ("edgeHeaderRewrite", &ds.edge_header_rewrite),
                    ("midHeaderRewrite", &ds.mid_header_rewrite),
                ]
                .to_vec(),
                "cannot be set on a delivery service that uses a topology",
            )
        } else {
            (
                [
                    ("firstHeaderRewrite", &ds.first_header_rewrite),
                    ("innerHeaderRewrite", &ds.inner_header_rewrite),
                    ("lastHeaderRewrite", &ds.last_header_rewrite),
                ]
                .to_vec(),
                "can only be set on a delivery service that uses a topology",
            )
        };

        match forbidden.into_iter().find(|(_, value)| value.is_some()) {
            Some((field, _)) => Err(CoreError::validation(field, reason)),
            None => Ok(()),
        }
    }

    /// A capability may only be required if the current topology can still serve it
    pub fn validate_capability_addition(&self, ds: &DeliveryService, capability: &str) -> Result<(), CoreError> {
        let Some(name) = ds.topology.as_deref() else {
            return Ok(());
        };
        let topology = self.topology(name)?;
        let wanted = BTreeSet::from([capability.to_string()]);
        let unsatisfied = self.unsatisfied_capabilities(topology, ds.cdn_id, &wanted);
        if unsatisfied.is_empty() {
            Ok(())
        } else {
            Err(CoreError::UnsatisfiableCapability {
                topology: topology.name.clone(),
                cdn: ds.cdn_id,
                capabilities: unsatisfied,
            })
        }
    }

    /// Servers assigned directly to a Delivery Service. Topology-based services
    /// take only ORG servers from the topology's cache groups; others take
    /// servers of their own CDN.
    pub fn validate_server_assignment(&self, ds: &DeliveryService, host_names: &[String]) -> Result<(), CoreError> {
        let mut misplaced = BTreeSet::new();

        for host_name in host_names {
            let server = self
                .fleet
                .server(host_name)
                .ok_or_else(|| CoreError::not_found("server", host_name))?;

            match ds.topology.as_deref() {
                Some(name) => {
                    let topology = self.topology(name)?;
                    if !server.is_org() {
                        return Err(CoreError::validation(
                            "serverNames",
                            format!(
                                "server {} is not an ORG server; only ORG servers can be assigned to a delivery service with a topology",
                                host_name
                            ),
                        ));
                    }
                    if !topology.contains_cache_group(&server.cache_group) {
                        misplaced.insert(server.cache_group.clone());
                    }
                }
                None => {
                    if server.cdn_id != ds.cdn_id {
                        return Err(CoreError::validation(
                            "serverNames",
                            format!(
                                "server {} belongs to CDN {}, not the delivery service's CDN {}",
                                host_name, server.cdn_id, ds.cdn_id
                            ),
                        ));
                    }
                }
            }
        }

        match ds.topology.as_deref() {
            Some(name) if !misplaced.is_empty() => Err(CoreError::OrgCacheGroupMismatch {
                topology: name.to_string(),
                cache_groups: misplaced.into_iter().collect(),
            }),
            _ => Ok(()),
        }
    }

    fn topology(&self, name: &str) -> Result<&'a Topology, CoreError> {
        // an empty name is a reference to nothing, not a request to clear
        self.fleet
            .topology(name)
            .ok_or_else(|| CoreError::not_found("topology", name))
    }

    fn unsatisfied_capabilities(
        &self,
        topology: &Topology,
        cdn: CdnId,
        required: &BTreeSet<String>,
    ) -> Vec<String> {
        required
            .iter()
            .filter(|capability| {
                !topology.cache_groups.iter().any(|cg| {
                    self.fleet
                        .servers_in(cg, cdn)
                        .any(|server| server.capabilities.contains(capability.as_str()))
                })
            })
            .cloned()
            .collect()
    }
}
