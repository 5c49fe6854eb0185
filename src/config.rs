use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Process-wide proxy settings. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Upstream WMTS endpoint, without the query string.
    pub upstream_url: String,
    /// Address this proxy advertises in rewritten capabilities documents.
    pub self_url: String,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub bind: IpAddr,
    pub port: u16,
    pub cache_dir: PathBuf,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_body_size: usize, // bytes
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_url: String::new(),
            self_url: String::new(),
            referer: None,
            user_agent: None,
            bind: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            cache_dir: PathBuf::from("./cache"),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Upstream URL cannot be empty")] EmptyUpstream,
    #[error("Self URL cannot be empty")] EmptySelfUrl,
    #[error("Upstream URL must start with http:// or https://: {0}")] UnsupportedScheme(String),
    #[error("Timeout must be > 0")] InvalidTimeout,
    #[error("Max body size must be > 0")] InvalidMaxBody,
    #[error("Invalid value for header {0}")] InvalidHeader(&'static str),
}

impl ProxyConfig {
    pub fn new(upstream_url: impl Into<String>, self_url: impl Into<String>) -> Self {
        Self {
            upstream_url: upstream_url.into(),
            self_url: self_url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream_url.trim().is_empty() { return Err(ConfigError::EmptyUpstream); }
        if self.self_url.trim().is_empty() { return Err(ConfigError::EmptySelfUrl); }
        if !(self.upstream_url.starts_with("http://") || self.upstream_url.starts_with("https://")) {
            return Err(ConfigError::UnsupportedScheme(self.upstream_url.clone()));
        }
        if self.timeout.is_zero() || self.connect_timeout.is_zero() { return Err(ConfigError::InvalidTimeout); }
        if self.max_body_size == 0 { return Err(ConfigError::InvalidMaxBody); }
        if let Some(referer) = &self.referer {
            if axum::http::HeaderValue::from_str(referer).is_err() {
                return Err(ConfigError::InvalidHeader("Referer"));
            }
        }
        if let Some(agent) = &self.user_agent {
            if axum::http::HeaderValue::from_str(agent).is_err() {
                return Err(ConfigError::InvalidHeader("User-Agent"));
            }
        }
        Ok(())
    }
}
