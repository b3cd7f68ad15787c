// tests/metrics.rs
//
// One test per process: the Prometheus recorder is global.

mod common;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use signal_forge::create_router;
use signal_forge::metrics::Metrics;

#[tokio::test]
async fn metrics_endpoint_contains_expected_series() {
    let cfg = common::test_config();
    let metrics = Metrics::init(&cfg).expect("install recorder once per process");
    let app = create_router(common::offline_builder().build().unwrap()).merge(metrics.router());

    // Miss then hit on the same cache key; reddit fails, so the generator runs.
    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(Request::get("/sentiment/AAPL").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "fetch_cache_hits_total",
        "fetch_cache_misses_total",
        "provider_errors_total",
        "fetch_ms",
        "fetch_cache_ttl_secs",
    ] {
        assert!(text.contains(needle), "missing metric series: {needle}");
    }
}
