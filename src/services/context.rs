use tracing::Span;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::TenantId;
use crate::store::ResourceStore;
use crate::tenancy::TenantTree;

/// Who is asking, resolved by the transport layer before the core is called.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub requester: TenantId,
}

impl RequestContext {
    pub fn new(requester: TenantId) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            requester,
        }
    }

    pub fn span(&self, operation: &'static str) -> Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            requester = %self.requester,
            operation
        )
    }
}

/// Builds the tenant tree from the committed tenant records
pub(crate) async fn load_tree(store: &dyn ResourceStore, max_depth: usize) -> CoreResult<TenantTree> {
    let tenants = store.tenants().list().await?;
    TenantTree::build(&tenants, max_depth)
}
