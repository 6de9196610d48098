pub mod access;
pub mod tree;

pub use access::{AccessResolver, OwnedBy, Protected};
pub use tree::TenantTree;
