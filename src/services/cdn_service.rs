use std::sync::Arc;

use tracing::{info, Instrument};

use super::context::{load_tree, RequestContext};
use crate::concurrency::{
    evaluate_collection_read, evaluate_read, evaluate_write, ReadOutcome, ReadPreconditions,
    WritePreconditions,
};
use crate::error::{CoreError, CoreResult};
use crate::models::{Cdn, CdnId, CdnUpdate, NewCdn};
use crate::store::ResourceStore;
use crate::tenancy::{AccessResolver, TenantTree};

/// CDNs have no owning tenant; any active requester may see them.
pub struct CdnService {
    store: Arc<dyn ResourceStore>,
    max_depth: usize,
}

impl CdnService {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self::with_max_depth(store, crate::config::config().tenancy.max_depth)
    }

    pub fn with_max_depth(store: Arc<dyn ResourceStore>, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    pub async fn list(&self, ctx: &RequestContext, pre: &ReadPreconditions) -> CoreResult<ReadOutcome<Vec<Cdn>>> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            access.ensure_requester_active(ctx.requester)?;

            let mut cdns = access.filter_visible(ctx.requester, self.store.cdns().list().await?);
            cdns.sort_by(|a, b| a.name.cmp(&b.name));

            let (decision, newest) = evaluate_collection_read(cdns.iter().map(|c| c.last_updated), pre);
            Ok(ReadOutcome::decide(decision, newest, || cdns))
        }
        .instrument(ctx.span("cdn.list"))
        .await
    }

    pub async fn get(&self, ctx: &RequestContext, id: CdnId, pre: &ReadPreconditions) -> CoreResult<ReadOutcome<Cdn>> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);

            let cdn = self.find(&access, ctx, id).await?;
            let decision = evaluate_read(cdn.last_updated, pre);
            let last_modified = Some(cdn.last_updated);
            Ok(ReadOutcome::decide(decision, last_modified, || cdn))
        }
        .instrument(ctx.span("cdn.get"))
        .await
    }

    pub async fn find_by_name(&self, ctx: &RequestContext, name: &str) -> CoreResult<Vec<Cdn>> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            access.ensure_requester_active(ctx.requester)?;

            let found = self.store.cdns().find_by_key(name).await?;
            Ok(access.filter_visible(ctx.requester, found.into_iter().collect()))
        }
        .instrument(ctx.span("cdn.find_by_name"))
        .await
    }

    pub async fn create(&self, ctx: &RequestContext, new: NewCdn) -> CoreResult<Cdn> {
        async {
            let tree = self.tree().await?;
            AccessResolver::new(&tree).ensure_requester_active(ctx.requester)?;

            let record = Cdn {
                id: CdnId(0),
                name: required("name", &new.name)?,
                domain_name: required("domainName", &new.domain_name)?,
                dnssec_enabled: new.dnssec_enabled,
                last_updated: Default::default(),
            };
            let created = self.store.cdns().insert(record).await?;
            info!("Created CDN {} '{}'", created.id, created.name);
            Ok(created)
        }
        .instrument(ctx.span("cdn.create"))
        .await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: CdnId,
        update: CdnUpdate,
        pre: &WritePreconditions,
    ) -> CoreResult<Cdn> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            let current = self.find(&access, ctx, id).await?;
            access.authorize_mutate(ctx.requester, &current)?;
            evaluate_write(current.last_updated, pre).into_result()?;

            let mut next = current.clone();
            if let Some(name) = update.name.as_deref() {
                next.name = required("name", name)?;
            }
            if let Some(domain_name) = update.domain_name.as_deref() {
                next.domain_name = required("domainName", domain_name)?;
            }
            if let Some(dnssec_enabled) = update.dnssec_enabled {
                next.dnssec_enabled = dnssec_enabled;
            }

            let updated = self
                .store
                .cdns()
                .replace_if_unmodified(current.last_updated, next)
                .await?;
            info!("Updated CDN {} '{}'", updated.id, updated.name);
            Ok(updated)
        }
        .instrument(ctx.span("cdn.update"))
        .await
    }

    /// Rejected while any Delivery Service or server still references the CDN
    pub async fn delete(&self, ctx: &RequestContext, id: CdnId, pre: &WritePreconditions) -> CoreResult<Cdn> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            let current = self.find(&access, ctx, id).await?;
            access.authorize_mutate(ctx.requester, &current)?;

            let services = self
                .store
                .delivery_services()
                .list()
                .await?
                .into_iter()
                .filter(|ds| ds.cdn_id == id)
                .count();
            if services > 0 {
                return Err(CoreError::InUse {
                    kind: "cdn",
                    key: current.name.clone(),
                    detail: format!("{} delivery services are assigned to it", services),
                });
            }
            if self.store.fleet().await?.cdn_has_servers(id) {
                return Err(CoreError::InUse {
                    kind: "cdn",
                    key: current.name.clone(),
                    detail: "servers are assigned to it".to_string(),
                });
            }

            evaluate_write(current.last_updated, pre).into_result()?;
            let deleted = self.store.cdns().delete_if_unmodified(id, current.last_updated).await?;
            info!("Deleted CDN {} '{}'", deleted.id, deleted.name);
            Ok(deleted)
        }
        .instrument(ctx.span("cdn.delete"))
        .await
    }

    async fn find(&self, access: &AccessResolver<'_>, ctx: &RequestContext, id: CdnId) -> CoreResult<Cdn> {
        access.ensure_requester_active(ctx.requester)?;
        self.store
            .cdns()
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found("cdn", id))
    }

    async fn tree(&self) -> CoreResult<TenantTree> {
        load_tree(self.store.as_ref(), self.max_depth).await
    }
}

fn required(field: &str, value: &str) -> CoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::validation(field, "cannot be blank"));
    }
    Ok(value.to_string())
}
