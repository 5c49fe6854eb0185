use goose::prelude::*;
use rand::Rng;

/// Load testing suite for the WMTS caching proxy.
///
/// Simulates a map client panning around:
/// - Tiles at random positions (mostly cache misses on a cold cache)
/// - A small fixed tile neighbourhood (cache hits after warmup)
/// - Periodic GetCapabilities requests
/// - Health monitoring endpoint
///
/// # Usage
/// ```bash
/// cd loadtest
/// cargo run --release -- --host http://localhost:8000 --users 10 --hatch-rate 2 --run-time 60s
/// ```
///
/// The proxy must point at a real upstream; misses are bounded by upstream latency.

const LAYER: &str = "LAYER=GEOGRAPHICALGRIDSYSTEMS.MAPS&STYLE=normal&TILEMATRIXSET=PM";

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    GooseAttack::initialize()?
        .register_scenario(
            scenario!("MapBrowsing")
                .register_transaction(transaction!(random_tile).set_weight(10)?)
                .register_transaction(transaction!(capabilities).set_weight(1)?)
                .register_transaction(transaction!(health_check).set_weight(1)?)
        )
        .register_scenario(
            scenario!("CachePerformance")
                // Small fixed window guarantees hits once warm
                .register_transaction(transaction!(cached_tile).set_weight(15)?)
        )
        .execute()
        .await?;

    Ok(())
}

fn tile_path(zoom: u32, row: u32, col: u32, format: &str) -> String {
    format!(
        "/?SERVICE=WMTS&REQUEST=GetTile&VERSION=1.0.0&{}&FORMAT={}&TILEMATRIX={}&TILEROW={}&TILECOL={}",
        LAYER, format, zoom, row, col
    )
}

/// Requests a tile anywhere in the zoom-12 grid.
async fn random_tile(user: &mut GooseUser) -> TransactionResult {
    // Generate random parameters before await to satisfy Send bounds
    let path = {
        let mut rng = rand::thread_rng();
        let formats = ["image/jpeg", "image/png"];
        let format = formats[rng.gen_range(0..formats.len())];
        tile_path(12, rng.gen_range(0..4096), rng.gen_range(0..4096), format)
    };

    let _goose = user.get(&path).await?;
    Ok(())
}

/// Requests one of 16 fixed tiles.
async fn cached_tile(user: &mut GooseUser) -> TransactionResult {
    let path = {
        let mut rng = rand::thread_rng();
        tile_path(14, 5630 + rng.gen_range(0..4), 8300 + rng.gen_range(0..4), "image/jpeg")
    };

    let _goose = user.get(&path).await?;
    Ok(())
}

async fn capabilities(user: &mut GooseUser) -> TransactionResult {
    let _goose = user.get("/?SERVICE=WMTS&REQUEST=GetCapabilities").await?;
    Ok(())
}

async fn health_check(user: &mut GooseUser) -> TransactionResult {
    let _goose = user.get("/health").await?;
    Ok(())
}
