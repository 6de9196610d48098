use std::sync::Arc;

use tracing::{info, Instrument};

use super::context::{load_tree, RequestContext};
use crate::concurrency::{
    evaluate_collection_read, evaluate_read, evaluate_write, ReadOutcome, ReadPreconditions,
    WritePreconditions,
};
use crate::error::{CoreError, CoreResult};
use crate::filter::{Filter, ListParams, SortValue};
use crate::models::{
    CdnId, DeliveryService, DeliveryServiceId, DeliveryServiceUpdate, DsType, NewDeliveryService,
    TenantId,
};
use crate::store::ResourceStore;
use crate::tenancy::{AccessResolver, TenantTree};
use crate::topology::TopologyValidator;

const ORDER_COLUMNS: &[&str] = &["xmlId", "id", "displayName"];

/// Listing filters. Every filter narrows the set the requester can already see.
#[derive(Debug, Clone, Default)]
pub struct DeliveryServiceQuery {
    /// Restrict to the subtree of this tenant
    pub accessible_to: Option<TenantId>,
    pub cdn: Option<CdnId>,
    pub tenant: Option<TenantId>,
    pub ds_type: Option<DsType>,
    pub xml_id: Option<String>,
    pub active: Option<bool>,
    pub params: ListParams,
}

impl DeliveryServiceQuery {
    fn matches(&self, tree: &TenantTree, ds: &DeliveryService) -> bool {
        self.accessible_to
            .map_or(true, |t| tree.is_descendant_or_self(t, ds.tenant_id))
            && self.cdn.map_or(true, |c| ds.cdn_id == c)
            && self.tenant.map_or(true, |t| ds.tenant_id == t)
            && self.ds_type.map_or(true, |t| ds.ds_type == t)
            && self.xml_id.as_deref().map_or(true, |x| ds.xml_id == x)
            && self.active.map_or(true, |a| ds.active == a)
    }
}

pub struct DeliveryServiceService {
    store: Arc<dyn ResourceStore>,
    max_depth: usize,
}

impl DeliveryServiceService {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self::with_max_depth(store, crate::config::config().tenancy.max_depth)
    }

    pub fn with_max_depth(store: Arc<dyn ResourceStore>, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        query: &DeliveryServiceQuery,
        pre: &ReadPreconditions,
    ) -> CoreResult<ReadOutcome<Vec<DeliveryService>>> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            access.ensure_requester_active(ctx.requester)?;
            let filter = Filter::from_params(&query.params, ORDER_COLUMNS, "xmlId")?;

            let all = self.store.delivery_services().list().await?;
            let matching: Vec<DeliveryService> = access
                .filter_visible(ctx.requester, all)
                .into_iter()
                .filter(|ds| query.matches(&tree, ds))
                .collect();

            let (decision, newest) = evaluate_collection_read(matching.iter().map(|ds| ds.last_updated), pre);
            Ok(ReadOutcome::decide(decision, newest, || filter.apply(matching, sort_value)))
        }
        .instrument(ctx.span("deliveryservice.list"))
        .await
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        id: DeliveryServiceId,
        pre: &ReadPreconditions,
    ) -> CoreResult<ReadOutcome<DeliveryService>> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            access.ensure_requester_active(ctx.requester)?;

            let ds = self
                .store
                .delivery_services()
                .get(id)
                .await?
                .ok_or(CoreError::Forbidden)?;
            access.authorize_view(ctx.requester, &ds)?;

            let decision = evaluate_read(ds.last_updated, pre);
            let last_modified = Some(ds.last_updated);
            Ok(ReadOutcome::decide(decision, last_modified, || ds))
        }
        .instrument(ctx.span("deliveryservice.get"))
        .await
    }

    pub async fn find_by_xml_id(&self, ctx: &RequestContext, xml_id: &str) -> CoreResult<Vec<DeliveryService>> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            access.ensure_requester_active(ctx.requester)?;

            let found = self.store.delivery_services().find_by_key(xml_id).await?;
            Ok(access.filter_visible(ctx.requester, found.into_iter().collect()))
        }
        .instrument(ctx.span("deliveryservice.find_by_xml_id"))
        .await
    }

    pub async fn create(&self, ctx: &RequestContext, new: NewDeliveryService) -> CoreResult<DeliveryService> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            access.ensure_requester_active(ctx.requester)?;

            let xml_id = validate_xml_id(new.xml_id.as_deref())?;
            if new.display_name.trim().is_empty() {
                return Err(CoreError::validation("displayName", "cannot be blank"));
            }
            access.authorize_owner(ctx.requester, new.tenant_id)?;
            self.ensure_cdn(new.cdn_id).await?;

            let record = new.into_record(xml_id);
            TopologyValidator::check_header_rewrites(&record)?;
            if let Some(topology) = record.topology.as_deref() {
                let fleet = self.store.fleet().await?;
                TopologyValidator::new(&fleet).validate_assignment(&record, topology)?;
            }

            let created = self.store.delivery_services().insert(record).await?;
            info!("Created delivery service {} '{}' for tenant {}", created.id, created.xml_id, created.tenant_id);
            Ok(created)
        }
        .instrument(ctx.span("deliveryservice.create"))
        .await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: DeliveryServiceId,
        update: DeliveryServiceUpdate,
        pre: &WritePreconditions,
    ) -> CoreResult<DeliveryService> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            let current = self.load_for_mutation(&access, ctx, id).await?;

            let next = update.apply(&current);
            if current.has_ssl_keys() {
                if next.routing_name != current.routing_name {
                    return Err(CoreError::SslKeysProvisioned {
                        xml_id: current.xml_id.clone(),
                        field: "routingName",
                    });
                }
                if next.cdn_id != current.cdn_id {
                    return Err(CoreError::SslKeysProvisioned {
                        xml_id: current.xml_id.clone(),
                        field: "cdnId",
                    });
                }
            }
            evaluate_write(current.last_updated, pre).into_result()?;

            if next.display_name.trim().is_empty() {
                return Err(CoreError::validation("displayName", "cannot be blank"));
            }
            if next.tenant_id != current.tenant_id {
                access.authorize_owner(ctx.requester, next.tenant_id)?;
            }
            if next.cdn_id != current.cdn_id {
                self.ensure_cdn(next.cdn_id).await?;
            }

            TopologyValidator::check_header_rewrites(&next)?;
            let placement_changed = next.topology != current.topology
                || next.cdn_id != current.cdn_id
                || next.ds_type != current.ds_type;
            if let Some(topology) = next.topology.as_deref().filter(|_| placement_changed) {
                let fleet = self.store.fleet().await?;
                TopologyValidator::new(&fleet).validate_assignment(&next, topology)?;
            }

            let updated = self
                .store
                .delivery_services()
                .replace_if_unmodified(current.last_updated, next)
                .await?;
            info!("Updated delivery service {} '{}'", updated.id, updated.xml_id);
            Ok(updated)
        }
        .instrument(ctx.span("deliveryservice.update"))
        .await
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        id: DeliveryServiceId,
        pre: &WritePreconditions,
    ) -> CoreResult<DeliveryService> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            let current = self.load_for_mutation(&access, ctx, id).await?;
            evaluate_write(current.last_updated, pre).into_result()?;

            let deleted = self
                .store
                .delivery_services()
                .delete_if_unmodified(id, current.last_updated)
                .await?;
            info!("Deleted delivery service {} '{}'", deleted.id, deleted.xml_id);
            Ok(deleted)
        }
        .instrument(ctx.span("deliveryservice.delete"))
        .await
    }

    pub async fn add_required_capability(
        &self,
        ctx: &RequestContext,
        id: DeliveryServiceId,
        capability: &str,
    ) -> CoreResult<DeliveryService> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            let current = self.load_for_mutation(&access, ctx, id).await?;

            let capability = capability.trim();
            if capability.is_empty() {
                return Err(CoreError::validation("requiredCapability", "cannot be blank"));
            }
            if current.required_capabilities.contains(capability) {
                return Err(CoreError::AlreadyExists {
                    kind: "required capability",
                    name: format!("{} on {}", capability, current.xml_id),
                });
            }

            let fleet = self.store.fleet().await?;
            TopologyValidator::new(&fleet).validate_capability_addition(&current, capability)?;

            let mut next = current.clone();
            next.required_capabilities.insert(capability.to_string());
            let updated = self
                .store
                .delivery_services()
                .replace_if_unmodified(current.last_updated, next)
                .await?;
            info!("Delivery service '{}' now requires {}", updated.xml_id, capability);
            Ok(updated)
        }
        .instrument(ctx.span("deliveryservice.add_required_capability"))
        .await
    }

    pub async fn remove_required_capability(
        &self,
        ctx: &RequestContext,
        id: DeliveryServiceId,
        capability: &str,
    ) -> CoreResult<DeliveryService> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            let current = self.load_for_mutation(&access, ctx, id).await?;

            let mut next = current.clone();
            if !next.required_capabilities.remove(capability) {
                return Err(CoreError::not_found(
                    "required capability",
                    format!("{} on {}", capability, current.xml_id),
                ));
            }
            let updated = self
                .store
                .delivery_services()
                .replace_if_unmodified(current.last_updated, next)
                .await?;
            info!("Delivery service '{}' no longer requires {}", updated.xml_id, capability);
            Ok(updated)
        }
        .instrument(ctx.span("deliveryservice.remove_required_capability"))
        .await
    }

    /// Assigns servers directly. With `replace` the given list becomes the whole assignment.
    pub async fn assign_servers(
        &self,
        ctx: &RequestContext,
        id: DeliveryServiceId,
        host_names: &[String],
        replace: bool,
    ) -> CoreResult<DeliveryService> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            let current = self.load_for_mutation(&access, ctx, id).await?;

            let fleet = self.store.fleet().await?;
            TopologyValidator::new(&fleet).validate_server_assignment(&current, host_names)?;

            let mut next = current.clone();
            if replace {
                next.assigned_servers.clear();
            }
            next.assigned_servers.extend(host_names.iter().cloned());
            let updated = self
                .store
                .delivery_services()
                .replace_if_unmodified(current.last_updated, next)
                .await?;
            info!(
                "Delivery service '{}' has {} assigned servers",
                updated.xml_id,
                updated.assigned_servers.len()
            );
            Ok(updated)
        }
        .instrument(ctx.span("deliveryservice.assign_servers"))
        .await
    }

    /// Records that SSL key material exists. The keys themselves live elsewhere.
    pub async fn record_ssl_keys(
        &self,
        ctx: &RequestContext,
        id: DeliveryServiceId,
        version: i32,
    ) -> CoreResult<DeliveryService> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            let current = self.load_for_mutation(&access, ctx, id).await?;

            let mut next = current.clone();
            next.ssl_key_version = Some(version);
            let updated = self
                .store
                .delivery_services()
                .replace_if_unmodified(current.last_updated, next)
                .await?;
            info!("Recorded SSL key version {} for '{}'", version, updated.xml_id);
            Ok(updated)
        }
        .instrument(ctx.span("deliveryservice.record_ssl_keys"))
        .await
    }

    /// The caller named the record, so a missing one is reported as such
    async fn load_for_mutation(
        &self,
        access: &AccessResolver<'_>,
        ctx: &RequestContext,
        id: DeliveryServiceId,
    ) -> CoreResult<DeliveryService> {
        access.ensure_requester_active(ctx.requester)?;
        let current = self
            .store
            .delivery_services()
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found("deliveryservice", id))?;
        access.authorize_mutate(ctx.requester, &current)?;
        Ok(current)
    }

    async fn ensure_cdn(&self, cdn: CdnId) -> CoreResult<()> {
        match self.store.cdns().get(cdn).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::not_found("cdn", cdn)),
        }
    }

    async fn tree(&self) -> CoreResult<TenantTree> {
        load_tree(self.store.as_ref(), self.max_depth).await
    }
}

fn sort_value(ds: &DeliveryService, column: &str) -> SortValue {
    match column {
        "id" => ds.id.0.into(),
        "displayName" => ds.display_name.as_str().into(),
        _ => ds.xml_id.as_str().into(),
    }
}

fn validate_xml_id(xml_id: Option<&str>) -> CoreResult<String> {
    let xml_id = xml_id.map(str::trim).unwrap_or_default();
    if xml_id.is_empty() {
        return Err(CoreError::validation("xmlId", "cannot be blank"));
    }
    if xml_id.chars().any(char::is_whitespace) {
        return Err(CoreError::validation("xmlId", "cannot contain spaces"));
    }
    Ok(xml_id.to_string())
}
