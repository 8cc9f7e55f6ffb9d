// Gateway metrics.
// Monotonic counters for cache and network activity, shared across requests.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters updated as the gateway serves requests.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    network_fetches: AtomicU64,
    offline_fallbacks: AtomicU64,
    failed_lookups: AtomicU64,
}

/// Point-in-time copy of the gateway counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Asset requests served straight from the store.
    pub cache_hits: u64,
    /// Asset requests not found in the store.
    pub cache_misses: u64,
    /// Successful network fetches, any branch.
    pub network_fetches: u64,
    /// Navigations served from the store after a network failure.
    pub offline_fallbacks: u64,
    /// Store lookups that errored (treated as misses).
    pub failed_lookups: u64,
}

impl GatewayMetrics {
    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_network_fetch(&self) {
        self.network_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_offline_fallback(&self) {
        self.offline_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_lookup(&self) {
        self.failed_lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            network_fetches: self.network_fetches.load(Ordering::Relaxed),
            offline_fallbacks: self.offline_fallbacks.load(Ordering::Relaxed),
            failed_lookups: self.failed_lookups.load(Ordering::Relaxed),
        }
    }
}
