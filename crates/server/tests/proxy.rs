mod support;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;

use support::{dead_url, gateway, json, post_json, send, Stub, ACCOUNT_KEY};

#[tokio::test]
async fn forwarding_is_verbatim_and_repeatable() -> anyhow::Result<()> {
    let accounts = Stub::default().reply(
        "/api/accounts/start-registration",
        StatusCode::ACCEPTED,
        json!({ "succeeded": true, "message": "Code sent" }),
    );
    let app = gateway(&accounts.spawn().await, &dead_url().await);

    let raw = r#"{ "email" : "a@x.io",  "extra": [1,2] }"#;
    let first = send(&app, post_json("/auth/start-registration", raw)).await;
    let second = send(&app, post_json("/auth/start-registration", raw)).await;
    assert_eq!(first.0, StatusCode::ACCEPTED);
    assert_eq!(first.0, second.0);
    assert_eq!(first.2, second.2);
    assert_eq!(first.1["content-type"], "application/json");

    let hits = accounts.hits();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].method, Method::POST);
    assert_eq!(hits[0].key.as_deref(), Some(ACCOUNT_KEY));
    assert_eq!(hits[0].content_type.as_deref(), Some("application/json"));
    // bytes are not re-serialized
    assert_eq!(&hits[0].body[..], raw.as_bytes());
    Ok(())
}

#[tokio::test]
async fn downstream_errors_pass_through_unchanged() -> anyhow::Result<()> {
    let accounts = Stub::default().reply("/api/accounts/reset-password", StatusCode::BAD_REQUEST, "token expired");
    let app = gateway(&accounts.spawn().await, &dead_url().await);

    let (status, headers, body) = send(&app, post_json("/auth/reset-password", r#"{"token":"t"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(&body[..], b"token expired");
    Ok(())
}

#[tokio::test]
async fn account_routes_map_methods_and_segments() -> anyhow::Result<()> {
    let accounts = Stub::default()
        .reply("/api/accounts/U1", StatusCode::OK, json!({ "id": "U1" }))
        .reply("/api/accounts/by-email/john%20doe@x.io", StatusCode::OK, json!({ "id": "U2" }))
        .reply("/api/accounts/U1/email-confirmation-token", StatusCode::OK, json!({ "sent": true }));
    let app = gateway(&accounts.spawn().await, &dead_url().await);

    let req = Request::builder().method("GET").uri("/auth/account/U1").body(Body::from("ignored"))?;
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["id"], "U1");

    let req = Request::builder().method("PUT").uri("/auth/account/U1").body(Body::from(r#"{"city":"Oslo"}"#))?;
    assert_eq!(send(&app, req).await.0, StatusCode::OK);

    let req = Request::builder().method("DELETE").uri("/auth/account/U1").body(Body::empty())?;
    assert_eq!(send(&app, req).await.0, StatusCode::OK);

    let req = Request::builder()
        .method("GET")
        .uri("/auth/account/by-email/john%20doe%40x.io")
        .body(Body::empty())?;
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["id"], "U2");

    let (status, _, _) = send(&app, post_json("/auth/account/U1/email-confirmation-token", "{}")).await;
    assert_eq!(status, StatusCode::OK);

    let hits = accounts.hits();
    let seen: Vec<(Method, &str)> = hits.iter().map(|h| (h.method.clone(), h.path.as_str())).collect();
    assert_eq!(
        seen,
        vec![
            (Method::GET, "/api/accounts/U1"),
            (Method::PUT, "/api/accounts/U1"),
            (Method::DELETE, "/api/accounts/U1"),
            (Method::GET, "/api/accounts/by-email/john%20doe@x.io"),
            (Method::POST, "/api/accounts/U1/email-confirmation-token"),
        ]
    );
    assert!(hits[0].body.is_empty(), "GET must not forward a body");
    assert_eq!(&hits[1].body[..], br#"{"city":"Oslo"}"#);
    Ok(())
}

#[tokio::test]
async fn token_routes_go_to_token_service() -> anyhow::Result<()> {
    let accounts = Stub::default();
    let tokens = Stub::default()
        .reply("/GenerateToken", StatusCode::OK, json!({ "succeeded": true, "accessToken": "T" }))
        .reply("/validate-token", StatusCode::UNAUTHORIZED, json!({ "valid": false }));
    let app = gateway(&accounts.spawn().await, &tokens.spawn().await);

    let (status, _, body) = send(&app, post_json("/auth/generate-token", r#"{"userId":"U"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["accessToken"], "T");

    let (status, _, body) = send(&app, post_json("/auth/validate-token", r#"{"token":"x"}"#)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body), json!({ "valid": false }));

    assert_eq!(tokens.hits().len(), 2);
    assert_eq!(tokens.hits()[0].key, None);
    assert!(accounts.hits().is_empty());
    Ok(())
}

#[tokio::test]
async fn unreachable_downstream_is_a_generic_502() -> anyhow::Result<()> {
    let app = gateway(&dead_url().await, &dead_url().await);
    for uri in ["/auth/forgot-password", "/auth/validate-credentials", "/auth/confirm-email-code"] {
        let (status, headers, body) = send(&app, post_json(uri, "{}")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY, "{uri}");
        assert_eq!(headers["content-type"], "application/problem+json");
        let body = json(&body);
        assert_eq!(body["code"], "DOWNSTREAM_UNAVAILABLE");
        assert_eq!(body["succeeded"], false);
        assert!(!body.to_string().contains("127.0.0.1"));
    }
    Ok(())
}
