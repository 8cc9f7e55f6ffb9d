// Gateway configuration.
// Store naming, cache root resolution, and the precache URL list.

use std::path::PathBuf;

/// Environment variable overriding the cache root directory.
pub const CACHE_DIR_ENV: &str = "AIRLOCK_CACHE_DIR";

/// Configuration for an offline gateway.
///
/// The store name is version-tagged by convention (e.g. `myapp-v8`);
/// bumping the version supersedes the previous store, which is deleted
/// when the new one is activated.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Versioned name of the response store.
    pub store_name: String,
    /// Cache root override. When `None`, the platform cache directory is used.
    pub cache_root: Option<PathBuf>,
    /// User agent sent with every network fetch.
    pub user_agent: String,
    /// Asset URLs warmed into the store at install time.
    pub precache: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            store_name: "airlock-v1".to_string(),
            cache_root: None,
            user_agent: concat!("airlock/", env!("CARGO_PKG_VERSION")).to_string(),
            precache: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Create a configuration for the given versioned store name.
    pub fn new(store_name: impl Into<String>) -> Self {
        Self {
            store_name: store_name.into(),
            ..Self::default()
        }
    }

    /// Apply the `AIRLOCK_CACHE_DIR` environment override, if set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
            if !dir.is_empty() {
                self.cache_root = Some(PathBuf::from(dir));
            }
        }
        self
    }
}
