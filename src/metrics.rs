use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Request counters shared by all handlers.
#[derive(Debug, Default)]
pub struct ProxyMetrics {
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub upstream_errors: AtomicU64,
    pub cache_write_failures: AtomicU64,
    pub rejected_requests: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub upstream_errors: u64,
    pub cache_write_failures: u64,
    pub rejected_requests: u64,
}

impl ProxyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
            cache_write_failures: self.cache_write_failures.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
        }
    }

    /// Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let s = self.snapshot();
        format!(
            "# HELP wmts_proxy_cache_hits_total Total number of cache hits\n\
             # TYPE wmts_proxy_cache_hits_total counter\n\
             wmts_proxy_cache_hits_total {}\n\
             # HELP wmts_proxy_cache_misses_total Total number of cache misses\n\
             # TYPE wmts_proxy_cache_misses_total counter\n\
             wmts_proxy_cache_misses_total {}\n\
             # HELP wmts_proxy_upstream_errors_total Upstream failures and non-200 responses\n\
             # TYPE wmts_proxy_upstream_errors_total counter\n\
             wmts_proxy_upstream_errors_total {}\n\
             # HELP wmts_proxy_cache_write_failures_total Failed cache writes\n\
             # TYPE wmts_proxy_cache_write_failures_total counter\n\
             wmts_proxy_cache_write_failures_total {}\n\
             # HELP wmts_proxy_rejected_requests_total Requests rejected as non-WMTS\n\
             # TYPE wmts_proxy_rejected_requests_total counter\n\
             wmts_proxy_rejected_requests_total {}\n",
            s.cache_hits, s.cache_misses, s.upstream_errors, s.cache_write_failures, s.rejected_requests
        )
    }
}

pub(crate) fn incr(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}
