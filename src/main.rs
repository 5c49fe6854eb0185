use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use wmts_proxy::config::{ProxyConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_BODY_SIZE, DEFAULT_PORT};
use wmts_proxy::{build_engine, router};

/// Caching WMTS proxy: serves tiles and capabilities from a local cache,
/// fetching misses from the upstream server.
#[derive(Parser, Debug)]
#[command(name = "wmts-proxy", version)]
struct Cli {
    /// Upstream WMTS endpoint, e.g. https://tiles.example.org/wmts
    upstream_url: String,

    /// URL clients should use to reach this proxy (substituted into capabilities)
    self_url: String,

    /// Referer header sent to the upstream server
    #[arg(long, env = "WMTS_PROXY_REFERER")]
    referer: Option<String>,

    /// User-Agent header sent to the upstream server
    #[arg(long, env = "WMTS_PROXY_USER_AGENT")]
    user_agent: Option<String>,

    /// Listen port
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Directory holding cached tiles
    #[arg(long, env = "WMTS_PROXY_CACHE_DIR", default_value = "cache")]
    cache_dir: PathBuf,

    /// Upstream request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Largest upstream body accepted, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_SIZE)]
    max_body_size: usize,
}

impl From<Cli> for ProxyConfig {
    fn from(cli: Cli) -> Self {
        ProxyConfig {
            upstream_url: cli.upstream_url,
            self_url: cli.self_url,
            referer: cli.referer,
            user_agent: cli.user_agent,
            bind: cli.bind,
            port: cli.port,
            cache_dir: cli.cache_dir,
            timeout: Duration::from_secs(cli.timeout_secs),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_body_size: cli.max_body_size,
        }
    }
}

/// Resolves once Ctrl-C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with environment-based filtering
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wmts_proxy=debug,tower_http=debug".into())
        )
        .init();

    let cfg = ProxyConfig::from(Cli::parse());
    cfg.validate()?;

    tracing::info!(
        "Starting WMTS proxy: upstream={}, advertised as {}, cache={}",
        cfg.upstream_url, cfg.self_url, cfg.cache_dir.display()
    );

    let addr = SocketAddr::new(cfg.bind, cfg.port);
    let engine = build_engine(cfg).await?;
    let app = router(engine);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
