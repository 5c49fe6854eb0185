#![allow(dead_code)]

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use wmts_proxy::cache::DiskCache;
use wmts_proxy::config::ProxyConfig;
use wmts_proxy::fetch::{Upstream, UpstreamResponse};
use wmts_proxy::proxy::ProxyEngine;
use wmts_proxy::WmtsProxyError;

pub const UPSTREAM: &str = "http://upstream/wmts";
pub const SELF_URL: &str = "http://myproxy:8000";

/// Canned upstream that records every URL it is asked for.
pub struct FakeUpstream {
    status: StatusCode,
    content_type: Option<&'static str>,
    body: Bytes,
    pub calls: Mutex<Vec<String>>,
}

impl FakeUpstream {
    pub fn new(status: StatusCode, content_type: Option<&'static str>, body: impl Into<Bytes>) -> Arc<Self> {
        Arc::new(Self {
            status,
            content_type,
            body: body.into(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn png(body: impl Into<Bytes>) -> Arc<Self> {
        Self::new(StatusCode::OK, Some("image/png"), body)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Upstream for FakeUpstream {
    async fn get(&self, url: &str) -> Result<UpstreamResponse, WmtsProxyError> {
        self.calls.lock().unwrap().push(url.to_string());
        let mut headers = HeaderMap::new();
        if let Some(ct) = self.content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        headers.insert("x-upstream-secret", HeaderValue::from_static("dropped"));
        Ok(UpstreamResponse { status: self.status, headers, body: self.body.clone() })
    }
}

/// Upstream that is always unreachable.
pub struct DownUpstream;

#[async_trait::async_trait]
impl Upstream for DownUpstream {
    async fn get(&self, _url: &str) -> Result<UpstreamResponse, WmtsProxyError> {
        Err(WmtsProxyError::NetworkError("connection refused".into()))
    }
}

pub fn test_config(cache_dir: &std::path::Path) -> ProxyConfig {
    let mut cfg = ProxyConfig::new(UPSTREAM, SELF_URL);
    cfg.cache_dir = cache_dir.to_path_buf();
    cfg
}

pub async fn engine_with(dir: &tempfile::TempDir, upstream: Arc<dyn Upstream>) -> Arc<ProxyEngine> {
    let cfg = test_config(dir.path());
    let cache = DiskCache::open(dir.path()).await.unwrap();
    Arc::new(ProxyEngine::new(Arc::new(cfg), Arc::new(cache), upstream))
}
