//! Typed HTTP calls to the account and token services.
//!
//! One [`DownstreamClient`] wraps one `reqwest::Client`, so every provider and
//! the reverse proxy share a single connection pool. Calls are made once, with
//! no retry, and are bounded by the configured timeouts.

use std::time::{Duration, Instant};

use axum::body::Bytes;
use configs::{ProvidersConfig, ServiceTarget};
use reqwest::{Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::observability::{DOWNSTREAM_DURATION, DOWNSTREAM_REQUESTS_TOTAL};

/// Header carrying the per-service access key.
pub const ACCESS_KEY_HEADER: &str = "x-functions-key";

#[derive(Debug, Clone, Error)]
pub enum DownstreamError {
    /// No response was received (connect error, timeout, bad URL).
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("downstream responded with status {status}")]
    NonSuccessStatus { status: StatusCode, body: String },
    /// 2xx response whose body does not fit the expected shape.
    #[error("unexpected downstream response body: {reason}")]
    DeserializationFailure { reason: String, body: String },
}

impl DownstreamError {
    fn outcome(&self) -> &'static str {
        match self {
            DownstreamError::TransportFailure(_) => "transport_failure",
            DownstreamError::NonSuccessStatus { .. } => "non_success_status",
            DownstreamError::DeserializationFailure { .. } => "deserialization_failure",
        }
    }

    /// Human-readable message a downstream service put in its error body, if
    /// it sent one as JSON (`message`, `Message`, `detail` or `title`).
    pub fn rejection_message(&self) -> Option<String> {
        let DownstreamError::NonSuccessStatus { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        ["message", "Message", "detail", "title"]
            .iter()
            .find_map(|k| value.get(*k).and_then(|v| v.as_str()))
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
    }
}

/// Status and body of a downstream response, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Join `segments` onto `base`, percent-encoding each segment.
pub fn build_url(base: &str, segments: &[&str]) -> Result<Url, DownstreamError> {
    let mut url = Url::parse(base)
        .map_err(|e| DownstreamError::TransportFailure(format!("invalid downstream url {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| DownstreamError::TransportFailure(format!("downstream url {base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn record_outcome(target: ServiceTarget, outcome: &str) {
    DOWNSTREAM_REQUESTS_TOTAL.with_label_values(&[target.as_str(), outcome]).inc();
}

fn carries_body(method: &Method) -> bool {
    !(method == Method::GET || method == Method::DELETE)
}

#[derive(Clone)]
pub struct DownstreamClient {
    http: reqwest::Client,
}

impl DownstreamClient {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { http })
    }

    pub fn from_config(cfg: &ProvidersConfig) -> anyhow::Result<Self> {
        Self::new(cfg.connect_timeout(), cfg.request_timeout())
    }

    /// Send `body` as-is and return whatever status and body come back.
    /// Only transport problems are errors here.
    pub async fn send_raw(
        &self,
        target: ServiceTarget,
        method: Method,
        url: Url,
        body: Option<Bytes>,
        access_key: Option<&str>,
    ) -> Result<RawResponse, DownstreamError> {
        let mut req = self.http.request(method.clone(), url.clone());
        if let Some(key) = access_key {
            req = req.header(ACCESS_KEY_HEADER, key);
        }
        if let Some(bytes) = body.filter(|_| carries_body(&method)) {
            req = req
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes);
        }
        let raw = self.execute(target, &method, &url, req).await?;
        let outcome = if raw.status.is_success() { "ok" } else { "non_success_status" };
        record_outcome(target, outcome);
        Ok(raw)
    }

    /// Serialize `payload` as JSON (skipped for GET/DELETE), send it, and
    /// decode a 2xx body into `T`.
    pub async fn call<P, T>(
        &self,
        target: ServiceTarget,
        method: Method,
        url: Url,
        payload: Option<&P>,
        access_key: Option<&str>,
    ) -> Result<T, DownstreamError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = self.http.request(method.clone(), url.clone());
        if let Some(key) = access_key {
            req = req.header(ACCESS_KEY_HEADER, key);
        }
        if let Some(p) = payload.filter(|_| carries_body(&method)) {
            req = req.json(p);
        }

        let raw = self.execute(target, &method, &url, req).await?;
        if !raw.status.is_success() {
            let err = DownstreamError::NonSuccessStatus {
                status: raw.status,
                body: String::from_utf8_lossy(&raw.body).into_owned(),
            };
            warn!(%target, %method, %url, status = %raw.status, body = %String::from_utf8_lossy(&raw.body), "downstream rejected request");
            record_outcome(target, err.outcome());
            return Err(err);
        }

        match serde_json::from_slice::<T>(&raw.body) {
            Ok(decoded) => {
                record_outcome(target, "ok");
                Ok(decoded)
            }
            Err(e) => {
                let err = DownstreamError::DeserializationFailure {
                    reason: e.to_string(),
                    body: String::from_utf8_lossy(&raw.body).into_owned(),
                };
                warn!(%target, %method, %url, error = %e, body = %String::from_utf8_lossy(&raw.body), "downstream response did not match expected shape");
                record_outcome(target, err.outcome());
                Err(err)
            }
        }
    }

    /// Send and time one request. Only transport failures are counted here;
    /// callers record the outcome once they know it.
    async fn execute(
        &self,
        target: ServiceTarget,
        method: &Method,
        url: &Url,
        req: reqwest::RequestBuilder,
    ) -> Result<RawResponse, DownstreamError> {
        debug!(%target, %method, %url, "calling downstream");
        let started = Instant::now();
        let result = async {
            let resp = req.send().await?;
            let status = resp.status();
            let body = resp.bytes().await?;
            Ok::<_, reqwest::Error>(RawResponse { status, body })
        }
        .await;
        DOWNSTREAM_DURATION
            .with_label_values(&[target.as_str()])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(raw) => {
                debug!(%target, %method, %url, status = %raw.status, "downstream responded");
                Ok(raw)
            }
            Err(e) => {
                let err = DownstreamError::TransportFailure(e.to_string());
                warn!(%target, %method, %url, error = %e, timeout = e.is_timeout(), "downstream unreachable");
                record_outcome(target, err.outcome());
                Err(err)
            }
        }
    }
}
