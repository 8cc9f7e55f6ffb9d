// Offline cache policy.
// Decides, per intercepted request, whether to serve from the network or
// the local response store: network-first for navigations, cache-first
// for everything else.

pub mod metrics;

pub use metrics::{GatewayMetrics, MetricsSnapshot};

use tracing::{debug, info, warn};

use crate::cache::{self, ResponseStore};
use crate::config::GatewayConfig;
use crate::error::{AirlockError, Result};
use crate::net::HttpClient;
use crate::resource::{Request, Response};

/// Local response store capability.
pub trait CacheBackend {
    /// Look up a previously stored response. `Ok(None)` means no entry.
    fn lookup(&self, request: &Request) -> Result<Option<Response>>;

    /// Store a response for later lookups, replacing any previous entry.
    fn store(&self, request: &Request, response: &Response) -> Result<()>;
}

/// Network fetch capability.
///
/// An `Err` means transport failure (offline, refused, DNS); HTTP-level
/// failures are `Ok` responses carrying their status code.
#[allow(async_fn_in_trait)]
pub trait NetworkBackend {
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

impl CacheBackend for ResponseStore {
    fn lookup(&self, request: &Request) -> Result<Option<Response>> {
        ResponseStore::lookup(self, request)
    }

    fn store(&self, request: &Request, response: &Response) -> Result<()> {
        ResponseStore::store(self, request, response)
    }
}

/// The offline cache policy over injected cache and network backends.
///
/// Every request resolves through exactly one of two branches, selected
/// by `Request::is_navigation`. Requests are independent; the gateway
/// holds no per-request state and takes `&self` throughout.
pub struct Gateway<C, N> {
    cache: C,
    network: N,
    metrics: GatewayMetrics,
}

/// Gateway wired to the on-disk store and the reqwest backend.
pub type OfflineGateway = Gateway<ResponseStore, HttpClient>;

impl<C: CacheBackend, N: NetworkBackend> Gateway<C, N> {
    /// Build a gateway from explicit backends.
    pub fn with_backends(cache: C, network: N) -> Self {
        Self {
            cache,
            network,
            metrics: GatewayMetrics::default(),
        }
    }

    /// Access the cache backend, e.g. for invalidation.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Copy the current metrics counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Resolve a request to exactly one response, from network or cache.
    pub async fn fetch(&self, request: &Request) -> Result<Response> {
        if request.is_navigation() {
            self.fetch_navigation(request).await
        } else {
            self.fetch_asset(request).await
        }
    }

    /// Navigations are network-first: fresh content when reachable,
    /// cached copy only when the network fails, error when neither works.
    async fn fetch_navigation(&self, request: &Request) -> Result<Response> {
        match self.network.fetch(request).await {
            Ok(response) => {
                self.metrics.record_network_fetch();
                debug!(url = %request.url, status = response.status, "navigation served from network");
                Ok(response)
            }
            Err(err) => {
                debug!(url = %request.url, error = %err, "navigation fetch failed, trying cache");
                match self.cache.lookup(request) {
                    Ok(Some(response)) => {
                        self.metrics.record_offline_fallback();
                        debug!(url = %request.url, "navigation served from cache");
                        Ok(response)
                    }
                    Ok(None) => Err(AirlockError::Offline {
                        url: request.url.clone(),
                    }),
                    Err(lookup_err) => {
                        self.metrics.record_failed_lookup();
                        warn!(url = %request.url, error = %lookup_err, "cache lookup failed");
                        Err(AirlockError::Offline {
                            url: request.url.clone(),
                        })
                    }
                }
            }
        }
    }

    /// Assets are cache-first: a stored copy is trusted unconditionally,
    /// the network is only consulted on a miss. A successful GET response
    /// populates the store on the way out.
    async fn fetch_asset(&self, request: &Request) -> Result<Response> {
        match self.cache.lookup(request) {
            Ok(Some(response)) => {
                self.metrics.record_cache_hit();
                debug!(url = %request.url, "asset served from cache");
                return Ok(response);
            }
            Ok(None) => {
                self.metrics.record_cache_miss();
            }
            Err(err) => {
                // An unreadable entry reads as a miss; the network copy
                // will replace it below.
                self.metrics.record_failed_lookup();
                warn!(url = %request.url, error = %err, "cache lookup failed, falling back to network");
            }
        }

        let response = self.network.fetch(request).await?;
        self.metrics.record_network_fetch();

        if should_store(request, &response) {
            if let Err(err) = self.cache.store(request, &response) {
                warn!(url = %request.url, error = %err, "failed to cache asset response");
            }
        }

        Ok(response)
    }

    /// Warm the store with a list of asset URLs (the install step).
    ///
    /// Already-cached URLs are skipped and failed URLs logged; a partial
    /// warm-up never fails the pass. Returns how many entries were written.
    pub async fn precache(&self, urls: &[String]) -> Result<usize> {
        let mut warmed = 0;

        for url in urls {
            let request = Request::asset(url.clone());

            match self.cache.lookup(&request) {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(err) => {
                    self.metrics.record_failed_lookup();
                    warn!(url = %request.url, error = %err, "cache lookup failed during precache");
                }
            }

            match self.network.fetch(&request).await {
                Ok(response) if should_store(&request, &response) => {
                    self.metrics.record_network_fetch();
                    match self.cache.store(&request, &response) {
                        Ok(()) => warmed += 1,
                        Err(err) => {
                            warn!(url = %request.url, error = %err, "failed to store precached response")
                        }
                    }
                }
                Ok(response) => {
                    self.metrics.record_network_fetch();
                    warn!(url = %request.url, status = response.status, "not precaching non-success response");
                }
                Err(err) => {
                    warn!(url = %request.url, error = %err, "precache fetch failed");
                }
            }
        }

        if warmed > 0 {
            info!(warmed, "precache warmed store");
        }

        Ok(warmed)
    }
}

impl OfflineGateway {
    /// Open the configured store, purge stale store versions, and wire up
    /// the network client.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let root = config
            .cache_root
            .clone()
            .or_else(cache::default_cache_root)
            .ok_or(AirlockError::NoCacheDir)?;

        let store = ResponseStore::open(&root, &config.store_name)?;
        let purged = store.purge_stale_versions()?;
        info!(store = %store.name(), purged, "response store activated");

        let network = HttpClient::new(&config.user_agent)?;
        Ok(Self::with_backends(store, network))
    }
}

/// Population policy: only successful GET responses are worth keeping.
fn should_store(request: &Request, response: &Response) -> bool {
    request.method == "GET" && response.is_success()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::RequestMode;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    /// In-memory cache backend with scriptable failure modes.
    #[derive(Default)]
    struct FakeCache {
        entries: Mutex<HashMap<(String, String), Response>>,
        fail_lookups: bool,
        fail_stores: bool,
    }

    impl FakeCache {
        fn with_entry(request: &Request, response: Response) -> Self {
            let cache = Self::default();
            cache.insert(request, response);
            cache
        }

        fn insert(&self, request: &Request, response: Response) {
            self.entries
                .lock()
                .unwrap()
                .insert(key(request), response);
        }

        fn len(&self) -> usize {
            self.entries.lock().unwrap().len()
        }
    }

    fn key(request: &Request) -> (String, String) {
        (request.method.clone(), request.url.clone())
    }

    impl CacheBackend for FakeCache {
        fn lookup(&self, request: &Request) -> Result<Option<Response>> {
            if self.fail_lookups {
                return Err(AirlockError::Other("lookup failed".to_string()));
            }
            Ok(self.entries.lock().unwrap().get(&key(request)).cloned())
        }

        fn store(&self, request: &Request, response: &Response) -> Result<()> {
            if self.fail_stores {
                return Err(AirlockError::Other("store failed".to_string()));
            }
            self.insert(request, response.clone());
            Ok(())
        }
    }

    /// Network backend serving scripted responses and counting calls.
    #[derive(Default)]
    struct FakeNetwork {
        responses: HashMap<String, std::result::Result<Response, String>>,
        calls: AtomicUsize,
    }

    impl FakeNetwork {
        /// Every fetch fails, as if the machine is offline.
        fn offline() -> Self {
            Self::default()
        }

        fn serving(url: &str, response: Response) -> Self {
            let mut network = Self::default();
            network.responses.insert(url.to_string(), Ok(response));
            network
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl NetworkBackend for FakeNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(&request.url) {
                Some(Ok(response)) => Ok(response.clone()),
                Some(Err(message)) => Err(AirlockError::Other(message.clone())),
                None => Err(AirlockError::Other(format!(
                    "connection refused: {}",
                    request.url
                ))),
            }
        }
    }

    const PAGE: &str = "https://example.com/";
    const SCRIPT: &str = "https://example.com/app.js";

    #[tokio::test]
    async fn test_navigation_prefers_network() {
        let request = Request::navigation(PAGE);
        let cache = FakeCache::with_entry(&request, Response::new(200, "stale page"));
        let network = FakeNetwork::serving(PAGE, Response::new(200, "fresh page"));
        let gateway = Gateway::with_backends(cache, network);

        let response = gateway.fetch(&request).await.unwrap();
        assert_eq!(response.body, b"fresh page");

        // The cached copy is neither served nor refreshed.
        let cached = gateway.cache().lookup(&request).unwrap().unwrap();
        assert_eq!(cached.body, b"stale page");
        assert_eq!(gateway.metrics().offline_fallbacks, 0);
    }

    #[tokio::test]
    async fn test_navigation_success_writes_nothing() {
        let request = Request::navigation(PAGE);
        let network = FakeNetwork::serving(PAGE, Response::new(200, "page"));
        let gateway = Gateway::with_backends(FakeCache::default(), network);

        gateway.fetch(&request).await.unwrap();
        assert_eq!(gateway.cache().len(), 0);
    }

    #[tokio::test]
    async fn test_navigation_error_status_is_still_a_response() {
        // HTTP-level failure is not a transport failure; no cache fallback.
        let request = Request::navigation(PAGE);
        let cache = FakeCache::with_entry(&request, Response::new(200, "cached page"));
        let network = FakeNetwork::serving(PAGE, Response::new(404, "not found"));
        let gateway = Gateway::with_backends(cache, network);

        let response = gateway.fetch(&request).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_navigation_falls_back_to_cache_when_offline() {
        let request = Request::navigation(PAGE);
        let cache = FakeCache::with_entry(&request, Response::new(200, "cached page"));
        let gateway = Gateway::with_backends(cache, FakeNetwork::offline());

        let response = gateway.fetch(&request).await.unwrap();
        assert_eq!(response.body, b"cached page");
        assert_eq!(gateway.metrics().offline_fallbacks, 1);
    }

    #[tokio::test]
    async fn test_navigation_offline_without_cache_fails() {
        let request = Request::navigation(PAGE);
        let gateway = Gateway::with_backends(FakeCache::default(), FakeNetwork::offline());

        match gateway.fetch(&request).await {
            Err(AirlockError::Offline { url }) => assert_eq!(url, PAGE),
            other => panic!("expected Offline, got {:?}", other.map(|r| r.status)),
        }
    }

    #[tokio::test]
    async fn test_navigation_offline_with_broken_cache_fails() {
        let cache = FakeCache {
            fail_lookups: true,
            ..FakeCache::default()
        };
        let gateway = Gateway::with_backends(cache, FakeNetwork::offline());

        let result = gateway.fetch(&Request::navigation(PAGE)).await;
        assert!(matches!(result, Err(AirlockError::Offline { .. })));
        assert_eq!(gateway.metrics().failed_lookups, 1);
    }

    #[tokio::test]
    async fn test_asset_cache_hit_skips_network() {
        let request = Request::asset(SCRIPT);
        let cache = FakeCache::with_entry(&request, Response::new(200, "cached js"));
        let gateway = Gateway::with_backends(cache, FakeNetwork::offline());

        let response = gateway.fetch(&request).await.unwrap();
        assert_eq!(response.body, b"cached js");

        // Zero network calls on a hit.
        assert_eq!(gateway.network.calls(), 0);
        assert_eq!(gateway.metrics().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_asset_miss_fetches_once_and_populates() {
        let request = Request::asset(SCRIPT);
        let network = FakeNetwork::serving(SCRIPT, Response::new(200, "network js"));
        let gateway = Gateway::with_backends(FakeCache::default(), network);

        let response = gateway.fetch(&request).await.unwrap();
        assert_eq!(response.body, b"network js");
        assert_eq!(gateway.network.calls(), 1);

        // The miss populated the store; the next fetch is a hit.
        let response = gateway.fetch(&request).await.unwrap();
        assert_eq!(response.body, b"network js");
        assert_eq!(gateway.network.calls(), 1);
        assert_eq!(gateway.metrics().cache_hits, 1);
        assert_eq!(gateway.metrics().cache_misses, 1);
    }

    #[tokio::test]
    async fn test_asset_error_response_not_cached() {
        let request = Request::asset(SCRIPT);
        let network = FakeNetwork::serving(SCRIPT, Response::new(404, "missing"));
        let gateway = Gateway::with_backends(FakeCache::default(), network);

        let response = gateway.fetch(&request).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(gateway.cache().len(), 0);
    }

    #[tokio::test]
    async fn test_asset_lookup_failure_reads_as_miss() {
        let cache = FakeCache {
            fail_lookups: true,
            ..FakeCache::default()
        };
        let network = FakeNetwork::serving(SCRIPT, Response::new(200, "network js"));
        let gateway = Gateway::with_backends(cache, network);

        let response = gateway.fetch(&Request::asset(SCRIPT)).await.unwrap();
        assert_eq!(response.body, b"network js");
        assert_eq!(gateway.metrics().failed_lookups, 1);
    }

    #[tokio::test]
    async fn test_asset_store_failure_still_serves_response() {
        let cache = FakeCache {
            fail_stores: true,
            ..FakeCache::default()
        };
        let network = FakeNetwork::serving(SCRIPT, Response::new(200, "network js"));
        let gateway = Gateway::with_backends(cache, network);

        let response = gateway.fetch(&Request::asset(SCRIPT)).await.unwrap();
        assert_eq!(response.body, b"network js");
    }

    #[tokio::test]
    async fn test_asset_miss_offline_propagates_failure() {
        let gateway = Gateway::with_backends(FakeCache::default(), FakeNetwork::offline());

        let result = gateway.fetch(&Request::asset(SCRIPT)).await;
        assert!(matches!(result, Err(AirlockError::Other(_))));
    }

    #[tokio::test]
    async fn test_every_non_navigate_mode_is_cache_first() {
        for mode in [
            RequestMode::SameOrigin,
            RequestMode::Cors,
            RequestMode::NoCors,
            RequestMode::Unknown,
        ] {
            let request = Request::get(SCRIPT, mode);
            let cache = FakeCache::with_entry(&request, Response::new(200, "cached"));
            let gateway = Gateway::with_backends(cache, FakeNetwork::offline());

            let response = gateway.fetch(&request).await.unwrap();
            assert_eq!(response.body, b"cached");
            assert_eq!(gateway.network.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_precache_warms_only_missing_urls() {
        let style = "https://example.com/style.css";
        let cached = Request::asset(SCRIPT);
        let cache = FakeCache::with_entry(&cached, Response::new(200, "cached js"));
        let network = FakeNetwork::serving(style, Response::new(200, "css"));
        let gateway = Gateway::with_backends(cache, network);

        let warmed = gateway
            .precache(&[SCRIPT.to_string(), style.to_string()])
            .await
            .unwrap();

        assert_eq!(warmed, 1);
        assert_eq!(gateway.network.calls(), 1);
        assert_eq!(gateway.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_precache_survives_failures() {
        let bad = "https://example.com/unreachable.js";
        let error_page = "https://example.com/gone.js";
        let network = FakeNetwork::serving(error_page, Response::new(410, "gone"));
        let gateway = Gateway::with_backends(FakeCache::default(), network);

        let warmed = gateway
            .precache(&[bad.to_string(), error_page.to_string()])
            .await
            .unwrap();

        assert_eq!(warmed, 0);
        assert_eq!(gateway.cache().len(), 0);
    }

    #[test]
    fn test_population_policy() {
        let get = Request::asset(SCRIPT);
        assert!(should_store(&get, &Response::new(200, "ok")));
        assert!(!should_store(&get, &Response::new(404, "missing")));

        let mut head = get.clone();
        head.method = "HEAD".to_string();
        assert!(!should_store(&head, &Response::new(200, "")));
    }

    // The policy against the real on-disk store: populate while online,
    // then serve the same asset from a fresh gateway while offline.
    #[tokio::test]
    async fn test_disk_store_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        let request = Request::asset(SCRIPT);

        let store = ResponseStore::open(temp_dir.path(), "app-v1").unwrap();
        let network = FakeNetwork::serving(SCRIPT, Response::new(200, "network js"));
        let gateway = Gateway::with_backends(store, network);
        gateway.fetch(&request).await.unwrap();

        let store = ResponseStore::open(temp_dir.path(), "app-v1").unwrap();
        let gateway = Gateway::with_backends(store, FakeNetwork::offline());
        let response = gateway.fetch(&request).await.unwrap();
        assert_eq!(response.body, b"network js");
        assert_eq!(gateway.network.calls(), 0);
    }
}
