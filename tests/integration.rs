mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{engine_with, FakeUpstream, UPSTREAM};
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot`
use wmts_proxy::router;

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_tile_request_through_router() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = FakeUpstream::png(&b"tile-bytes"[..]);
    let app = router(engine_with(&dir, upstream.clone()).await);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/?SERVICE=WMTS&REQUEST=GetTile&FORMAT=image/png&X=1&Y=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(body_bytes(response).await, b"tile-bytes");

    let again = app
        .oneshot(
            Request::builder()
                .uri("/?SERVICE=WMTS&REQUEST=GetTile&FORMAT=image/png&X=1&Y=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(body_bytes(again).await, b"tile-bytes");
    assert_eq!(
        upstream.calls(),
        vec![format!("{}?SERVICE=WMTS&REQUEST=GetTile&FORMAT=image/png&X=1&Y=2", UPSTREAM)]
    );
}

#[tokio::test]
async fn test_favicon_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = FakeUpstream::png(&b"x"[..]);
    let app = router(engine_with(&dir, upstream.clone()).await);

    let response = app
        .oneshot(Request::builder().uri("/favicon.ico").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_post_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = FakeUpstream::png(&b"x"[..]);
    let app = router(engine_with(&dir, upstream.clone()).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/?SERVICE=WMTS&REQUEST=GetTile&FORMAT=image/png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_upstream_503_reaches_client() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = FakeUpstream::new(StatusCode::SERVICE_UNAVAILABLE, Some("text/plain"), "unavailable");
    let app = router(engine_with(&dir, upstream).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/?SERVICE=WMTS&REQUEST=GetTile&FORMAT=image/jpeg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert!(response.headers().get("x-upstream-secret").is_none());
    assert_eq!(body_bytes(response).await, b"unavailable");
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(engine_with(&dir, FakeUpstream::png(&b"x"[..])).await);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "wmts-proxy");
}

#[tokio::test]
async fn test_stats_and_metrics_count_requests() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(engine_with(&dir, FakeUpstream::png(&b"x"[..])).await);

    for _ in 0..2 {
        app.clone()
            .oneshot(
                Request::builder()
                    .uri("/?SERVICE=WMTS&REQUEST=GetTile&FORMAT=image/png&X=9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
    }

    let stats = app
        .clone()
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes(stats).await).unwrap();
    assert_eq!(json["cache_hits"], 1);
    assert_eq!(json["cache_misses"], 1);

    let metrics = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let text = String::from_utf8(body_bytes(metrics).await).unwrap();
    assert!(text.contains("wmts_proxy_cache_hits_total 1"));
    assert!(text.contains("wmts_proxy_cache_misses_total 1"));
}
