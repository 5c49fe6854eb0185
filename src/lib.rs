use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod cache;
pub mod config;
pub mod fetch;
pub mod metrics;
pub mod proxy;
pub mod rewrite;

use crate::cache::DiskCache;
use crate::config::ProxyConfig;
use crate::fetch::ReqwestUpstream;
use crate::proxy::ProxyEngine;

#[derive(Error, Debug)]
pub enum WmtsProxyError {
    #[error("Unhandled request GET {0}")]
    InvalidRequest(String),
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Upstream body exceeds {0} bytes")]
    BodyTooLarge(usize),
    #[error("Cache error: {0}")]
    CacheError(#[from] std::io::Error),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl WmtsProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WmtsProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            WmtsProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            WmtsProxyError::NetworkError(_) | WmtsProxyError::BodyTooLarge(_) => StatusCode::BAD_GATEWAY,
            WmtsProxyError::CacheError(_) | WmtsProxyError::InvalidArgument(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, WmtsProxyError>;

/// Open the on-disk cache and the upstream client described by `config`.
///
/// Fails if the cache directory cannot be created or the client cannot be built.
pub async fn build_engine(config: ProxyConfig) -> Result<Arc<ProxyEngine>> {
    let cache = DiskCache::open(config.cache_dir.clone()).await?;
    let upstream = ReqwestUpstream::new(&config)?;
    Ok(Arc::new(ProxyEngine::new(Arc::new(config), Arc::new(cache), Arc::new(upstream))))
}

/// Every request that is not an observability route lands here.
async fn wmts_handler(
    State(engine): State<Arc<ProxyEngine>>,
    method: Method,
    uri: Uri,
) -> impl IntoResponse {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    engine.handle(&method, &target).await
}

/// Health check endpoint
async fn health_handler() -> impl IntoResponse {
    use serde_json::json;

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "wmts-proxy"
    }))
}

/// Request counters as JSON
async fn stats_handler(State(engine): State<Arc<ProxyEngine>>) -> impl IntoResponse {
    Json(engine.metrics().snapshot())
}

/// Metrics endpoint (Prometheus-compatible plain text)
async fn metrics_handler(State(engine): State<Arc<ProxyEngine>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        engine.metrics().render_prometheus(),
    )
}

pub fn router(engine: Arc<ProxyEngine>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(wmts_handler)
        .with_state(engine)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
