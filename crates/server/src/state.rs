use std::sync::Arc;

use configs::{ProvidersConfig, ServiceTarget};
use service::{
    auth::{
        providers::{HttpAccountProvider, HttpTokenProvider},
        AuthService,
    },
    downstream::DownstreamClient,
    proxy::ReverseProxy,
};

pub type GatewayAuthService = AuthService<HttpAccountProvider, HttpTokenProvider>;

/// Shared by every handler. Built once from configuration; the orchestrator
/// and the proxy share one HTTP connection pool.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<GatewayAuthService>,
    pub proxy: Arc<ReverseProxy>,
}

impl AppState {
    pub fn from_config(providers: &ProvidersConfig) -> anyhow::Result<Self> {
        let client = DownstreamClient::from_config(providers)?;
        let accounts = HttpAccountProvider::new(
            client.clone(),
            providers.endpoint(ServiceTarget::AccountService).clone(),
        );
        let tokens = HttpTokenProvider::new(
            client.clone(),
            providers.endpoint(ServiceTarget::TokenService).clone(),
        );
        Ok(Self {
            auth: Arc::new(AuthService::new(Arc::new(accounts), Arc::new(tokens))),
            proxy: Arc::new(ReverseProxy::new(client, providers.clone())),
        })
    }
}
