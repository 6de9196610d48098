use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub tenancy: TenancyConfig,
    pub listing: ListingConfig,
    pub concurrency: ConcurrencyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Name given to the bootstrap root tenant
    pub root_tenant_name: String,
    /// Upper bound on ancestor walks; deeper chains are treated as corrupt
    pub max_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub max_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Smallest step a last-modified stamp advances when the clock has not moved past it
    pub min_advance_micros: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        // Pick up a local .env if there is one
        let _ = dotenvy::dotenv();

        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Tenancy overrides
        if let Ok(v) = env::var("TENANCY_ROOT_TENANT_NAME") {
            if !v.trim().is_empty() {
                self.tenancy.root_tenant_name = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("TENANCY_MAX_DEPTH") {
            self.tenancy.max_depth = v.parse().unwrap_or(self.tenancy.max_depth);
        }

        // Listing overrides
        if let Ok(v) = env::var("LISTING_MAX_LIMIT") {
            self.listing.max_limit = v.parse().ok();
        }

        // Concurrency overrides
        if let Ok(v) = env::var("CONCURRENCY_MIN_ADVANCE_MICROS") {
            self.concurrency.min_advance_micros = v
                .parse::<i64>()
                .ok()
                .filter(|micros| *micros > 0)
                .unwrap_or(self.concurrency.min_advance_micros);
        }

        // Logging overrides
        if let Ok(v) = env::var("LOG_FILTER") {
            self.logging.filter = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            tenancy: TenancyConfig {
                root_tenant_name: "root".to_string(),
                max_depth: 100,
            },
            listing: ListingConfig {
                max_limit: Some(1000),
            },
            concurrency: ConcurrencyConfig {
                min_advance_micros: 1,
            },
            logging: LoggingConfig {
                filter: "cdn_tenancy_core=debug,info".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            tenancy: TenancyConfig {
                root_tenant_name: "root".to_string(),
                max_depth: 64,
            },
            listing: ListingConfig {
                max_limit: Some(500),
            },
            concurrency: ConcurrencyConfig {
                min_advance_micros: 1,
            },
            logging: LoggingConfig {
                filter: "cdn_tenancy_core=info,warn".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            tenancy: TenancyConfig {
                root_tenant_name: "root".to_string(),
                max_depth: 64,
            },
            listing: ListingConfig {
                max_limit: Some(100),
            },
            concurrency: ConcurrencyConfig {
                min_advance_micros: 1,
            },
            logging: LoggingConfig {
                filter: "warn".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
