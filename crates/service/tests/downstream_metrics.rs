//! Outcome counting for downstream calls. Lives in its own test binary so the
//! process-wide prometheus registry only sees the calls made here.

use std::time::Duration;

use axum::{http::StatusCode, routing::post, Json, Router};
use configs::ServiceTarget;
use reqwest::Method;
use service::auth::domain::TokenPair;
use service::downstream::{build_url, DownstreamClient, DownstreamError};
use service::observability::DOWNSTREAM_REQUESTS_TOTAL;
use tokio::net::TcpListener;

const OUTCOMES: [&str; 4] = ["ok", "non_success_status", "deserialization_failure", "transport_failure"];

fn samples(target: ServiceTarget, outcome: &str) -> u64 {
    DOWNSTREAM_REQUESTS_TOTAL.with_label_values(&[target.as_str(), outcome]).get()
}

fn snapshot(target: ServiceTarget) -> Vec<u64> {
    OUTCOMES.iter().map(|o| samples(target, o)).collect()
}

/// Per-outcome increments since `before`.
fn delta(target: ServiceTarget, before: &[u64]) -> Vec<(&'static str, u64)> {
    OUTCOMES
        .iter()
        .zip(before)
        .map(|(o, b)| (*o, samples(target, o) - b))
        .filter(|(_, d)| *d > 0)
        .collect()
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

// Single test: the counters are shared by every test in this binary.
#[tokio::test]
async fn each_call_is_counted_once_under_its_final_outcome() {
    let router = Router::new()
        .route("/malformed", post(|| async { Json(serde_json::json!({ "nope": 1 })) }))
        .route("/good", post(|| async { Json(serde_json::json!({ "succeeded": true, "accessToken": "a" })) }))
        .route("/missing", post(|| async { (StatusCode::NOT_FOUND, "gone") }));
    let base = spawn(router).await;
    let client = DownstreamClient::new(Duration::from_secs(2), Duration::from_secs(2)).unwrap();
    let body = serde_json::json!({});

    let before = snapshot(ServiceTarget::TokenService);
    let err = client
        .call::<_, TokenPair>(ServiceTarget::TokenService, Method::POST, build_url(&base, &["malformed"]).unwrap(), Some(&body), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DownstreamError::DeserializationFailure { .. }));
    assert_eq!(delta(ServiceTarget::TokenService, &before), vec![("deserialization_failure", 1)]);

    let before = snapshot(ServiceTarget::TokenService);
    client
        .call::<_, TokenPair>(ServiceTarget::TokenService, Method::POST, build_url(&base, &["good"]).unwrap(), Some(&body), None)
        .await
        .unwrap();
    assert_eq!(delta(ServiceTarget::TokenService, &before), vec![("ok", 1)]);

    let before = snapshot(ServiceTarget::AccountService);
    let raw = client
        .send_raw(ServiceTarget::AccountService, Method::POST, build_url(&base, &["missing"]).unwrap(), None, None)
        .await
        .unwrap();
    assert_eq!(raw.status, StatusCode::NOT_FOUND);
    assert_eq!(delta(ServiceTarget::AccountService, &before), vec![("non_success_status", 1)]);

    let before = snapshot(ServiceTarget::AccountService);
    let err = client
        .call::<_, TokenPair>(ServiceTarget::AccountService, Method::POST, build_url(&base, &["missing"]).unwrap(), Some(&body), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DownstreamError::NonSuccessStatus { .. }));
    assert_eq!(delta(ServiceTarget::AccountService, &before), vec![("non_success_status", 1)]);

    // a port nobody listens on
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let before = snapshot(ServiceTarget::AccountService);
    let err = client
        .send_raw(ServiceTarget::AccountService, Method::GET, build_url(&dead, &["x"]).unwrap(), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DownstreamError::TransportFailure(_)));
    assert_eq!(delta(ServiceTarget::AccountService, &before), vec![("transport_failure", 1)]);
}
