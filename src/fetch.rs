use crate::config::ProxyConfig;
use crate::WmtsProxyError;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::Client;

/// What the upstream server answered, whatever the status.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Outbound HTTP capability used by the proxy engine.
#[async_trait::async_trait]
pub trait Upstream: Send + Sync {
    /// Issue a GET for `url`. Non-200 statuses are returned, not raised.
    async fn get(&self, url: &str) -> Result<UpstreamResponse, WmtsProxyError>;
}

/// Build the upstream URL for a raw WMTS query string.
pub fn upstream_url_for(base: &str, query: &str) -> String {
    format!("{}?{}", base, query)
}

/// Upstream client backed by a single pooled `reqwest::Client`.
///
/// The configured Referer and User-Agent are the only request headers sent;
/// nothing from the inbound request is forwarded.
pub struct ReqwestUpstream {
    client: Client,
    max_body_size: usize,
}

impl ReqwestUpstream {
    pub fn new(config: &ProxyConfig) -> Result<Self, WmtsProxyError> {
        let mut headers = HeaderMap::new();
        if let Some(referer) = &config.referer {
            let value = HeaderValue::from_str(referer)
                .map_err(|_| WmtsProxyError::InvalidArgument("Invalid Referer".into()))?;
            headers.insert(header::REFERER, value);
        }
        if let Some(agent) = &config.user_agent {
            let value = HeaderValue::from_str(agent)
                .map_err(|_| WmtsProxyError::InvalidArgument("Invalid User-Agent".into()))?;
            headers.insert(header::USER_AGENT, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| WmtsProxyError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, max_body_size: config.max_body_size })
    }
}

#[async_trait::async_trait]
impl Upstream for ReqwestUpstream {
    async fn get(&self, url: &str) -> Result<UpstreamResponse, WmtsProxyError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WmtsProxyError::NetworkError(e.to_string()))?;

        let status = resp.status();
        let headers = resp.headers().clone();

        // Pre-flight size check based on Content-Length header
        if let Some(len) = resp.content_length() {
            if len > self.max_body_size as u64 {
                return Err(WmtsProxyError::BodyTooLarge(self.max_body_size));
            }
        }

        // Stream with size enforcement in case Content-Length lies or is absent
        let mut buf = BytesMut::with_capacity(8192);
        let mut stream = resp.bytes_stream();

        while let Some(chunk) = stream
            .next()
            .await
            .transpose()
            .map_err(|e| WmtsProxyError::NetworkError(e.to_string()))?
        {
            if buf.len() + chunk.len() > self.max_body_size {
                return Err(WmtsProxyError::BodyTooLarge(self.max_body_size));
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(UpstreamResponse { status, headers, body: buf.freeze() })
    }
}
