pub mod api;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;
pub mod tenancy;
pub mod topology;

pub use error::{CoreError, CoreResult};
