//! Stub downstream services and gateway wiring shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use configs::{AppConfig, ProvidersConfig, ServiceEndpoint};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::Service;

pub const ACCOUNT_KEY: &str = "acct-key";

#[derive(Debug, Clone)]
pub struct Hit {
    pub method: Method,
    pub path: String,
    pub key: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Hit {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Scripted downstream: replies by path, records every request.
#[derive(Clone, Default)]
pub struct Stub {
    replies: Arc<Mutex<HashMap<String, (StatusCode, String)>>>,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl Stub {
    pub fn reply(self, path: &str, status: StatusCode, body: impl ToString) -> Self {
        self.replies.lock().unwrap().insert(path.to_string(), (status, body.to_string()));
        self
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub async fn spawn(&self) -> String {
        let router = Router::new().fallback(record).with_state(self.clone());
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{addr}")
    }
}

async fn record(State(stub): State<Stub>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    stub.hits.lock().unwrap().push(Hit {
        method,
        path: uri.path().to_string(),
        key: header("x-functions-key"),
        content_type: header("content-type"),
        body,
    });
    let reply = stub.replies.lock().unwrap().get(uri.path()).cloned();
    match reply {
        Some((status, body)) => (status, body).into_response(),
        None => (StatusCode::NOT_FOUND, r#"{"message":"no stub"}"#).into_response(),
    }
}

/// A base URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Gateway router over the given account (`/api` prefixed) and token bases.
pub fn gateway(account_base: &str, token_base: &str) -> Router {
    let cfg = AppConfig {
        providers: ProvidersConfig {
            account_service: ServiceEndpoint {
                base_url: format!("{account_base}/api"),
                access_key: Some(ACCOUNT_KEY.into()),
            },
            token_service: ServiceEndpoint { base_url: token_base.to_string(), access_key: None },
            request_timeout_secs: 2,
            connect_timeout_secs: 1,
        },
        ..AppConfig::default()
    };
    server::startup::build_app(&cfg).unwrap()
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let resp = app.clone().call(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, headers, body)
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap()
}
