use tracing::{debug, warn};

use super::tree::TenantTree;
use crate::error::CoreError;
use crate::models::{Cdn, DeliveryService, Tenant, TenantId};

/// Anything access decisions are made about.
pub trait Protected {
    /// `None` for tenant-agnostic resources, which every active requester may see
    fn owner_tenant(&self) -> Option<TenantId>;

    /// Whether the owner's own active flag gates access
    fn requires_active_owner(&self) -> bool {
        true
    }
}

impl Protected for DeliveryService {
    fn owner_tenant(&self) -> Option<TenantId> {
        Some(self.tenant_id)
    }
}

impl Protected for Cdn {
    fn owner_tenant(&self) -> Option<TenantId> {
        None
    }
}

// A tenant is governed by subtree membership alone, so a deactivated tenant
// stays reachable for re-activation.
impl Protected for Tenant {
    fn owner_tenant(&self) -> Option<TenantId> {
        Some(self.id)
    }

    fn requires_active_owner(&self) -> bool {
        false
    }
}

/// Bare owner reference, for checks against a tenant a record is about to move to.
#[derive(Debug, Clone, Copy)]
pub struct OwnedBy(pub TenantId);

impl Protected for OwnedBy {
    fn owner_tenant(&self) -> Option<TenantId> {
        Some(self.0)
    }
}

pub struct AccessResolver<'a> {
    tree: &'a TenantTree,
}

impl<'a> AccessResolver<'a> {
    pub fn new(tree: &'a TenantTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &TenantTree {
        self.tree
    }

    pub fn ensure_requester_active(&self, requester: TenantId) -> Result<(), CoreError> {
        if self.tree.is_active(requester) {
            Ok(())
        } else {
            warn!("Denying request from inactive tenant {}", requester);
            Err(CoreError::TenantInactive { tenant: requester })
        }
    }

    fn permits<R: Protected + ?Sized>(&self, requester: TenantId, resource: &R) -> bool {
        if !self.tree.is_active(requester) {
            return false;
        }
        match resource.owner_tenant() {
            None => true,
            Some(owner) => {
                self.tree.is_descendant_or_self(requester, owner)
                    && (!resource.requires_active_owner() || self.tree.active_own_tenant(owner))
            }
        }
    }

    pub fn can_view<R: Protected + ?Sized>(&self, requester: TenantId, resource: &R) -> bool {
        self.permits(requester, resource)
    }

    /// Mutation has read parity within the requester's scope
    pub fn can_mutate<R: Protected + ?Sized>(&self, requester: TenantId, resource: &R) -> bool {
        self.permits(requester, resource)
    }

    fn authorize<R: Protected + ?Sized>(
        &self,
        requester: TenantId,
        resource: &R,
        action: &str,
    ) -> Result<(), CoreError> {
        self.ensure_requester_active(requester)?;
        if self.permits(requester, resource) {
            debug!("Tenant {} may {} resource owned by {:?}", requester, action, resource.owner_tenant());
            Ok(())
        } else {
            warn!("Tenant {} may not {} resource owned by {:?}", requester, action, resource.owner_tenant());
            Err(CoreError::Forbidden)
        }
    }

    pub fn authorize_view<R: Protected + ?Sized>(&self, requester: TenantId, resource: &R) -> Result<(), CoreError> {
        self.authorize(requester, resource, "view")
    }

    pub fn authorize_mutate<R: Protected + ?Sized>(&self, requester: TenantId, resource: &R) -> Result<(), CoreError> {
        self.authorize(requester, resource, "mutate")
    }

    /// Checks that records may be placed under `owner`
    pub fn authorize_owner(&self, requester: TenantId, owner: TenantId) -> Result<(), CoreError> {
        self.authorize(requester, &OwnedBy(owner), "assign to")
    }

    /// Listing filter: keeps what the requester may view, in order
    pub fn filter_visible<R: Protected>(&self, requester: TenantId, items: Vec<R>) -> Vec<R> {
        items
            .into_iter()
            .filter(|item| self.permits(requester, item))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tenant(id: i32, parent: i32, active: bool) -> Tenant {
        Tenant {
            id: TenantId(id),
            name: format!("tenant{}", id),
            active,
            parent_id: TenantId(parent),
            last_updated: Utc::now(),
        }
    }

    // root(1) -> 2 -> 3(inactive) -> 4 ; root -> 5 ; 2 -> 6(inactive)
    fn tree() -> TenantTree {
        TenantTree::build(
            &[
                tenant(1, 1, true),
                tenant(2, 1, true),
                tenant(3, 2, false),
                tenant(4, 3, true),
                tenant(5, 1, true),
                tenant(6, 2, false),
            ],
            16,
        )
        .unwrap()
    }

    #[test]
    fn view_requires_subtree_and_active_owner() {
        let tree = tree();
        let access = AccessResolver::new(&tree);

        assert!(access.can_view(TenantId(2), &OwnedBy(TenantId(2))));
        assert!(!access.can_view(TenantId(2), &OwnedBy(TenantId(3))));
        assert!(!access.can_view(TenantId(2), &OwnedBy(TenantId(5))));
        assert!(!access.can_view(TenantId(4), &OwnedBy(TenantId(2))));
    }

    #[test]
    fn inactive_ancestor_does_not_hide_active_descendant() {
        let tree = tree();
        let access = AccessResolver::new(&tree);
        // tenant 3 is inactive but 4 is not
        assert!(access.can_view(TenantId(2), &OwnedBy(TenantId(4))));
        assert!(access.can_view(TenantId(4), &OwnedBy(TenantId(4))));
    }

    #[test]
    fn inactive_requester_is_denied_everything() {
        let tree = tree();
        let access = AccessResolver::new(&tree);
        assert!(!access.can_view(TenantId(6), &OwnedBy(TenantId(6))));
        assert!(matches!(
            access.authorize_view(TenantId(6), &OwnedBy(TenantId(6))),
            Err(CoreError::TenantInactive { .. })
        ));
        assert!(matches!(
            access.authorize_mutate(TenantId(2), &OwnedBy(TenantId(5))),
            Err(CoreError::Forbidden)
        ));
    }

    #[test]
    fn inactive_tenant_object_stays_visible_to_ancestors() {
        let tree = tree();
        let access = AccessResolver::new(&tree);
        let inactive = tenant(3, 2, false);
        assert!(access.can_mutate(TenantId(2), &inactive));
        assert!(!access.can_mutate(TenantId(5), &inactive));
    }

    #[test]
    fn filter_keeps_visible_items() {
        let tree = tree();
        let access = AccessResolver::new(&tree);
        let owners: Vec<OwnedBy> = (1..=6).map(|id| OwnedBy(TenantId(id))).collect();
        let visible: Vec<i32> = access
            .filter_visible(TenantId(2), owners)
            .into_iter()
            .map(|o| o.0 .0)
            .collect();
        assert_eq!(visible, vec![2, 4]);
    }
}
