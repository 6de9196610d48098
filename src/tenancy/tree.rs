use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::CoreError;
use crate::models::{Tenant, TenantId};
use crate::store::StoreError;

#[derive(Debug, Clone)]
struct TenantNode {
    name: String,
    parent: TenantId,
    active: bool,
}

/// Arena of tenants plus a parent -> children index.
///
/// Built from the committed tenant records for each decision. Ancestor walks
/// are bounded by `max_depth`, so a corrupted chain fails instead of looping.
#[derive(Debug, Clone)]
pub struct TenantTree {
    root: TenantId,
    nodes: BTreeMap<TenantId, TenantNode>,
    children: BTreeMap<TenantId, BTreeSet<TenantId>>,
    max_depth: usize,
}

impl TenantTree {
    pub fn build(tenants: &[Tenant], max_depth: usize) -> Result<Self, CoreError> {
        let mut roots = tenants.iter().filter(|t| t.is_root());
        let root = match (roots.next(), roots.next()) {
            (Some(root), None) => root.id,
            (None, _) => return Err(corrupt("no root tenant")),
            (Some(_), Some(_)) => return Err(corrupt("more than one root tenant")),
        };

        let mut tree = Self {
            root,
            nodes: BTreeMap::new(),
            children: BTreeMap::new(),
            max_depth,
        };
        for tenant in tenants {
            tree.nodes.insert(
                tenant.id,
                TenantNode {
                    name: tenant.name.clone(),
                    parent: tenant.parent_id,
                    active: tenant.active,
                },
            );
        }
        for tenant in tenants.iter().filter(|t| !t.is_root()) {
            if !tree.nodes.contains_key(&tenant.parent_id) {
                return Err(corrupt(&format!(
                    "tenant {} references missing parent {}",
                    tenant.id, tenant.parent_id
                )));
            }
            tree.children.entry(tenant.parent_id).or_default().insert(tenant.id);
        }

        // every chain has to end at the root within the depth bound
        for tenant in tenants {
            tree.ancestors_checked(tenant.id)?;
        }

        Ok(tree)
    }

    pub fn root(&self) -> TenantId {
        self.root
    }

    pub fn contains(&self, id: TenantId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `None` for the root and for unknown tenants
    pub fn parent(&self, id: TenantId) -> Option<TenantId> {
        if id == self.root {
            return None;
        }
        self.nodes.get(&id).map(|n| n.parent)
    }

    pub fn name(&self, id: TenantId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.name.as_str())
    }

    /// A tenant's own flag. Ancestors are not consulted.
    pub fn is_active(&self, id: TenantId) -> bool {
        self.nodes.get(&id).map(|n| n.active).unwrap_or(false)
    }

    pub fn active_own_tenant(&self, resource_tenant: TenantId) -> bool {
        self.is_active(resource_tenant)
    }

    pub fn children(&self, id: TenantId) -> Vec<TenantId> {
        self.children
            .get(&id)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Proper ancestors, nearest first
    pub fn ancestors(&self, id: TenantId) -> Vec<TenantId> {
        self.ancestors_checked(id).unwrap_or_default()
    }

    fn ancestors_checked(&self, id: TenantId) -> Result<Vec<TenantId>, CoreError> {
        let mut out = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if out.len() >= self.max_depth {
                return Err(corrupt(&format!(
                    "ancestor chain of tenant {} exceeds depth {}",
                    id, self.max_depth
                )));
            }
            out.push(parent);
            current = parent;
        }
        Ok(out)
    }

    /// Number of proper ancestors; the root sits at depth 0
    pub fn depth(&self, id: TenantId) -> usize {
        self.ancestors(id).len()
    }

    /// Levels between `id` and its deepest descendant; 0 for a leaf
    pub fn height(&self, id: TenantId) -> usize {
        let mut deepest = 0;
        let mut queue = VecDeque::from([(id, 0usize)]);
        while let Some((next, level)) = queue.pop_front() {
            deepest = deepest.max(level);
            if level < self.max_depth {
                queue.extend(self.children(next).into_iter().map(|c| (c, level + 1)));
            }
        }
        deepest
    }

    fn too_deep(&self) -> CoreError {
        CoreError::validation(
            "parentId",
            format!("tenant hierarchy cannot be deeper than {} levels", self.max_depth),
        )
    }

    /// Checks whether a new leaf may be created under `parent`
    pub fn check_insert(&self, parent: TenantId) -> Result<(), CoreError> {
        if !self.contains(parent) {
            return Err(CoreError::not_found("tenant", parent));
        }
        if self.depth(parent) + 1 > self.max_depth {
            return Err(self.too_deep());
        }
        Ok(())
    }

    pub fn is_descendant_or_self(&self, root: TenantId, candidate: TenantId) -> bool {
        if !self.contains(root) || !self.contains(candidate) {
            return false;
        }
        root == candidate || self.ancestors(candidate).contains(&root)
    }

    /// `id` and all of its transitive descendants
    pub fn subtree(&self, id: TenantId) -> BTreeSet<TenantId> {
        let mut out = BTreeSet::new();
        if !self.contains(id) {
            return out;
        }
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            if out.insert(next) {
                queue.extend(self.children(next));
            }
        }
        out
    }

    /// Checks whether `tenant` may be moved under `new_parent` without changing the tree.
    pub fn check_parent(&self, tenant: TenantId, new_parent: TenantId) -> Result<(), CoreError> {
        if tenant == self.root {
            return Err(CoreError::ImmutableRoot);
        }
        if !self.contains(tenant) {
            return Err(CoreError::not_found("tenant", tenant));
        }
        if !self.contains(new_parent) {
            return Err(CoreError::not_found("tenant", new_parent));
        }
        if self.is_descendant_or_self(tenant, new_parent) {
            return Err(CoreError::Cycle {
                tenant,
                parent: new_parent,
            });
        }
        // the whole moved subtree has to stay within the bound
        if self.depth(new_parent) + 1 + self.height(tenant) > self.max_depth {
            return Err(self.too_deep());
        }
        Ok(())
    }

    pub fn assign_parent(&mut self, tenant: TenantId, new_parent: TenantId) -> Result<(), CoreError> {
        self.check_parent(tenant, new_parent)?;

        let old_parent = self.parent(tenant);
        if let Some(old) = old_parent {
            if let Some(siblings) = self.children.get_mut(&old) {
                siblings.remove(&tenant);
            }
        }
        self.children.entry(new_parent).or_default().insert(tenant);
        if let Some(node) = self.nodes.get_mut(&tenant) {
            node.parent = new_parent;
        }
        Ok(())
    }

    /// Adds a new leaf under an existing parent
    pub fn insert(&mut self, tenant: &Tenant) -> Result<(), CoreError> {
        self.check_insert(tenant.parent_id)?;
        self.nodes.insert(
            tenant.id,
            TenantNode {
                name: tenant.name.clone(),
                parent: tenant.parent_id,
                active: tenant.active,
            },
        );
        self.children.entry(tenant.parent_id).or_default().insert(tenant.id);
        Ok(())
    }

    pub fn set_active(&mut self, tenant: TenantId, active: bool) -> Result<(), CoreError> {
        if tenant == self.root && !active {
            return Err(CoreError::ImmutableRoot);
        }
        let node = self
            .nodes
            .get_mut(&tenant)
            .ok_or_else(|| CoreError::not_found("tenant", tenant))?;
        node.active = active;
        Ok(())
    }

    /// Rejects deleting the root or any tenant that still has children. Never cascades.
    pub fn check_removable(&self, tenant: TenantId) -> Result<(), CoreError> {
        if tenant == self.root {
            return Err(CoreError::ImmutableRoot);
        }
        if !self.contains(tenant) {
            return Err(CoreError::not_found("tenant", tenant));
        }
        let children = self.children(tenant);
        if !children.is_empty() {
            return Err(CoreError::HasChildren {
                tenant,
                name: self.name(tenant).unwrap_or_default().to_string(),
                children,
            });
        }
        Ok(())
    }

    pub fn remove(&mut self, tenant: TenantId) -> Result<(), CoreError> {
        self.check_removable(tenant)?;
        if let Some(parent) = self.parent(tenant) {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.remove(&tenant);
            }
        }
        self.nodes.remove(&tenant);
        self.children.remove(&tenant);
        Ok(())
    }
}

fn corrupt(detail: &str) -> CoreError {
    CoreError::Store(StoreError::Corrupt(detail.to_string()))
}
