use crate::cache::{Cache, CacheEntry, ContentKind};
use crate::config::ProxyConfig;
use crate::fetch::{upstream_url_for, Upstream};
use crate::metrics::{incr, ProxyMetrics};
use crate::rewrite::CapabilitiesRewriter;
use crate::WmtsProxyError;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::sync::Arc;

/// Every accepted request path starts with this.
pub const WMTS_PREFIX: &str = "/?SERVICE=WMTS&REQUEST=";

const OCTET_STREAM: &str = "application/octet-stream";

/// Transport-independent response: status, optional Content-Type and body.
///
/// No other headers are ever emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl ProxyResponse {
    fn serve(entry: CacheEntry) -> Self {
        let content_type = HeaderValue::from_str(&entry.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM));
        Self {
            status: StatusCode::OK,
            content_type: Some(content_type),
            body: entry.contents,
        }
    }
}

impl From<WmtsProxyError> for ProxyResponse {
    fn from(e: WmtsProxyError) -> Self {
        Self {
            status: e.status_code(),
            content_type: Some(HeaderValue::from_static("text/plain; charset=utf-8")),
            body: Bytes::from(e.to_string()),
        }
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        let headers = response.headers_mut();
        headers.remove(header::CONTENT_TYPE);
        if let Some(ct) = self.content_type {
            headers.insert(header::CONTENT_TYPE, ct);
        }
        response
    }
}

/// Extract the raw WMTS query string from a request target like `/?SERVICE=WMTS&REQUEST=...`.
pub fn wmts_query(path_and_query: &str) -> Result<&str, WmtsProxyError> {
    if !path_and_query.starts_with(WMTS_PREFIX) {
        return Err(WmtsProxyError::InvalidRequest(path_and_query.to_string()));
    }
    // drop the leading "/?"
    Ok(&path_and_query[2..])
}

/// Cache-or-fetch orchestration for WMTS GetTile / GetCapabilities requests.
pub struct ProxyEngine {
    config: Arc<ProxyConfig>,
    cache: Arc<dyn Cache>,
    upstream: Arc<dyn Upstream>,
    rewriter: CapabilitiesRewriter,
    metrics: Arc<ProxyMetrics>,
}

impl ProxyEngine {
    pub fn new(config: Arc<ProxyConfig>, cache: Arc<dyn Cache>, upstream: Arc<dyn Upstream>) -> Self {
        let rewriter = CapabilitiesRewriter::new(config.upstream_url.clone(), config.self_url.clone());
        Self {
            config,
            cache,
            upstream,
            rewriter,
            metrics: Arc::new(ProxyMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<ProxyMetrics> {
        &self.metrics
    }

    /// Handle one inbound request. Always produces a response.
    pub async fn handle(&self, method: &Method, path_and_query: &str) -> ProxyResponse {
        tracing::debug!("Processing request: {} {}", method, path_and_query);

        if *method != Method::GET {
            incr(&self.metrics.rejected_requests);
            tracing::warn!("Rejecting {} {}", method, path_and_query);
            return WmtsProxyError::MethodNotAllowed(method.to_string()).into();
        }

        let query = match wmts_query(path_and_query) {
            Ok(q) => q,
            Err(e) => {
                incr(&self.metrics.rejected_requests);
                tracing::warn!("Unhandled request GET {}", path_and_query);
                return e.into();
            }
        };

        match self.proxy(query).await {
            Ok(response) => response,
            Err(e) => {
                incr(&self.metrics.upstream_errors);
                tracing::error!("Failed to proxy query={}: {}", query, e);
                e.into()
            }
        }
    }

    /// Serve a raw WMTS query string from cache, or fetch, rewrite and cache it.
    pub async fn proxy(&self, query: &str) -> Result<ProxyResponse, WmtsProxyError> {
        match self.cache.try_get(query).await {
            Ok(Some(entry)) => {
                tracing::info!("Cache hit for query={}", query);
                incr(&self.metrics.cache_hits);
                // capabilities were rewritten before they were stored
                return Ok(ProxyResponse::serve(entry));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Cache read failed for query={}, treating as miss: {}", query, e),
        }

        let url = upstream_url_for(&self.config.upstream_url, query);
        tracing::info!("Cache miss for query={}, fetching {}", query, url);
        incr(&self.metrics.cache_misses);

        let resp = self.upstream.get(&url).await?;

        // Pass errors through once, with only Content-Type. Never cached.
        if resp.status != StatusCode::OK {
            incr(&self.metrics.upstream_errors);
            tracing::warn!("Upstream returned {} for {}", resp.status, url);
            return Ok(ProxyResponse {
                status: resp.status,
                content_type: resp.headers.get(header::CONTENT_TYPE).cloned(),
                body: resp.body,
            });
        }

        let content_type = resp.content_type().unwrap_or(OCTET_STREAM).to_string();
        let body = self.rewriter.apply(query, resp.body);
        let entry = CacheEntry::new(query, content_type, body);

        if ContentKind::from_query(query).is_some() {
            if let Err(e) = self.cache.put(&entry).await {
                incr(&self.metrics.cache_write_failures);
                tracing::warn!("Failed to cache response for query={}: {}", query, e);
                // Continue anyway - we can still serve it
            }
        } else {
            tracing::debug!("Query has no cacheable FORMAT, not storing: {}", query);
        }

        Ok(ProxyResponse::serve(entry))
    }
}
