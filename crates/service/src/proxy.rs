//! Pass-through forwarding for the endpoints the gateway does not orchestrate.

use axum::body::Bytes;
use configs::{ProvidersConfig, ServiceTarget};
use reqwest::{Method, StatusCode};
use tracing::{debug, instrument};

use crate::downstream::{build_url, DownstreamClient, DownstreamError};
use crate::observability::PROXY_FORWARDS_TOTAL;

/// Forwarded responses always declare JSON, whatever the downstream sent.
pub const PROXY_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: &'static str,
}

#[derive(Clone)]
pub struct ReverseProxy {
    client: DownstreamClient,
    providers: ProvidersConfig,
}

impl ReverseProxy {
    pub fn new(client: DownstreamClient, providers: ProvidersConfig) -> Self {
        Self { client, providers }
    }

    /// Forward `body` to `segments` under the target's base URL. Status and
    /// body come back unchanged; only transport failures are errors.
    /// The body is dropped for GET and DELETE.
    #[instrument(skip(self, body))]
    pub async fn forward(
        &self,
        target: ServiceTarget,
        method: Method,
        segments: &[&str],
        body: Option<Bytes>,
    ) -> Result<ProxyResponse, DownstreamError> {
        let endpoint = self.providers.endpoint(target);
        let url = build_url(&endpoint.base_url, segments)?;
        PROXY_FORWARDS_TOTAL.with_label_values(&[target.as_str()]).inc();

        let raw = self
            .client
            .send_raw(target, method, url, body, endpoint.access_key.as_deref())
            .await?;
        debug!(status = %raw.status, bytes = raw.body.len(), "forwarded");
        Ok(ProxyResponse { status: raw.status, body: raw.body, content_type: PROXY_CONTENT_TYPE })
    }
}
