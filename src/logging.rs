use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::config;

/// Installs the global subscriber. `RUST_LOG` wins over the configured filter.
/// Returns false when a subscriber was already installed.
pub fn init() -> bool {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config().logging.filter.clone());

    let installed = tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_target(!crate::is_production!()))
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Logging initialized in {:?} mode", config().environment);
    }
    installed
}
