// airlock: offline-first HTTP fetch gateway.
// Serves classified resource requests from the network or from a named,
// versioned on-disk response store. Navigations are network-first with a
// cache fallback; static assets are cache-first with a network fallback.

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod net;
pub mod resource;

pub use cache::{ResponseStore, default_cache_root};
pub use config::GatewayConfig;
pub use error::{AirlockError, Result};
pub use gateway::{
    CacheBackend, Gateway, GatewayMetrics, MetricsSnapshot, NetworkBackend, OfflineGateway,
};
pub use net::HttpClient;
pub use resource::{Request, RequestMode, Response};
