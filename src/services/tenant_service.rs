use std::sync::Arc;

use tracing::{info, Instrument};

use super::context::{load_tree, RequestContext};
use crate::concurrency::{
    evaluate_collection_read, evaluate_read, evaluate_write, ReadOutcome, ReadPreconditions,
    WritePreconditions,
};
use crate::error::{CoreError, CoreResult};
use crate::models::{NewTenant, Tenant, TenantId, TenantUpdate, TenantView};
use crate::store::ResourceStore;
use crate::tenancy::{AccessResolver, TenantTree};

pub struct TenantService {
    store: Arc<dyn ResourceStore>,
    max_depth: usize,
}

impl TenantService {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self::with_max_depth(store, crate::config::config().tenancy.max_depth)
    }

    pub fn with_max_depth(store: Arc<dyn ResourceStore>, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    /// Tenants in the requester's subtree, sorted by name
    pub async fn list(
        &self,
        ctx: &RequestContext,
        pre: &ReadPreconditions,
    ) -> CoreResult<ReadOutcome<Vec<TenantView>>> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            access.ensure_requester_active(ctx.requester)?;

            let mut visible = access.filter_visible(ctx.requester, self.store.tenants().list().await?);
            visible.sort_by(|a, b| a.name.cmp(&b.name));

            let (decision, newest) = evaluate_collection_read(visible.iter().map(|t| t.last_updated), pre);
            Ok(ReadOutcome::decide(decision, newest, || {
                visible.into_iter().map(|t| view(&tree, t)).collect()
            }))
        }
        .instrument(ctx.span("tenant.list"))
        .await
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        id: TenantId,
        pre: &ReadPreconditions,
    ) -> CoreResult<ReadOutcome<TenantView>> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            access.ensure_requester_active(ctx.requester)?;

            // a missing tenant looks the same as one outside the requester's subtree
            let tenant = self.store.tenants().get(id).await?.ok_or(CoreError::Forbidden)?;
            access.authorize_view(ctx.requester, &tenant)?;

            let decision = evaluate_read(tenant.last_updated, pre);
            let last_modified = Some(tenant.last_updated);
            Ok(ReadOutcome::decide(decision, last_modified, || view(&tree, tenant)))
        }
        .instrument(ctx.span("tenant.get"))
        .await
    }

    pub async fn find_by_name(&self, ctx: &RequestContext, name: &str) -> CoreResult<Vec<TenantView>> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            access.ensure_requester_active(ctx.requester)?;

            let found = self.store.tenants().find_by_key(name).await?;
            Ok(access
                .filter_visible(ctx.requester, found.into_iter().collect())
                .into_iter()
                .map(|t| view(&tree, t))
                .collect())
        }
        .instrument(ctx.span("tenant.find_by_name"))
        .await
    }

    pub async fn create(&self, ctx: &RequestContext, new: NewTenant) -> CoreResult<TenantView> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            access.ensure_requester_active(ctx.requester)?;

            let name = validate_name(&new.name)?;
            let parent = self
                .store
                .tenants()
                .get(new.parent_id)
                .await?
                .ok_or_else(|| CoreError::not_found("tenant", new.parent_id))?;
            access.authorize_mutate(ctx.requester, &parent)?;
            tree.check_insert(parent.id)?;

            let created = self
                .store
                .tenants()
                .insert(Tenant {
                    id: TenantId(0),
                    name,
                    active: new.active,
                    parent_id: parent.id,
                    last_updated: Default::default(),
                })
                .await?;

            info!("Created tenant {} '{}' under {}", created.id, created.name, parent.id);
            let mut tree = tree;
            tree.insert(&created)?;
            Ok(view(&tree, created))
        }
        .instrument(ctx.span("tenant.create"))
        .await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: TenantId,
        update: TenantUpdate,
        pre: &WritePreconditions,
    ) -> CoreResult<TenantView> {
        async {
            let mut tree = self.tree().await?;
            let current = {
                let access = AccessResolver::new(&tree);
                access.ensure_requester_active(ctx.requester)?;

                let current = self
                    .store
                    .tenants()
                    .get(id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("tenant", id))?;
                if current.is_root() {
                    return Err(CoreError::ImmutableRoot);
                }
                access.authorize_mutate(ctx.requester, &current)?;
                evaluate_write(current.last_updated, pre).into_result()?;
                current
            };

            let mut next = current.clone();
            if let Some(name) = update.name.as_deref() {
                next.name = validate_name(name)?;
            }
            if let Some(active) = update.active {
                tree.set_active(id, active)?;
                next.active = active;
            }
            if let Some(parent_id) = update.parent_id.filter(|p| *p != current.parent_id) {
                let parent = self
                    .store
                    .tenants()
                    .get(parent_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("tenant", parent_id))?;
                AccessResolver::new(&tree).authorize_mutate(ctx.requester, &parent)?;
                tree.assign_parent(id, parent_id)?;
                next.parent_id = parent_id;
            }

            let updated = self
                .store
                .tenants()
                .replace_if_unmodified(current.last_updated, next)
                .await?;

            info!("Updated tenant {} '{}'", updated.id, updated.name);
            Ok(view(&tree, updated))
        }
        .instrument(ctx.span("tenant.update"))
        .await
    }

    /// Deletes a leaf tenant. Children must be removed or reparented first.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        id: TenantId,
        pre: &WritePreconditions,
    ) -> CoreResult<Tenant> {
        async {
            let tree = self.tree().await?;
            let access = AccessResolver::new(&tree);
            access.ensure_requester_active(ctx.requester)?;

            let current = self
                .store
                .tenants()
                .get(id)
                .await?
                .ok_or_else(|| CoreError::not_found("tenant", id))?;
            if current.is_root() {
                return Err(CoreError::ImmutableRoot);
            }
            access.authorize_mutate(ctx.requester, &current)?;
            tree.check_removable(id)?;

            let owned = self.store.delivery_services().list_by_parent(id).await?;
            if !owned.is_empty() {
                return Err(CoreError::InUse {
                    kind: "tenant",
                    key: id.to_string(),
                    detail: format!("{} delivery services are assigned to it", owned.len()),
                });
            }

            evaluate_write(current.last_updated, pre).into_result()?;
            let deleted = self
                .store
                .tenants()
                .delete_if_unmodified(id, current.last_updated)
                .await?;

            info!("Deleted tenant {} '{}'", deleted.id, deleted.name);
            Ok(deleted)
        }
        .instrument(ctx.span("tenant.delete"))
        .await
    }

    async fn tree(&self) -> CoreResult<TenantTree> {
        load_tree(self.store.as_ref(), self.max_depth).await
    }
}

fn view(tree: &TenantTree, tenant: Tenant) -> TenantView {
    let parent_name = tree.parent(tenant.id).and_then(|p| tree.name(p)).map(str::to_string);
    TenantView {
        tenant,
        parent_name,
    }
}

fn validate_name(name: &str) -> CoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::validation("name", "cannot be blank"));
    }
    Ok(name.to_string())
}
