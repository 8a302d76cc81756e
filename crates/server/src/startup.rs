use axum::Router;
use configs::AppConfig;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Build the application router from configuration.
pub fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let state = AppState::from_config(&cfg.providers).map_err(|e| StartupError::Client(e.to_string()))?;
    Ok(routes::build_router(state, build_cors()))
}

/// Load and validate configuration from `config.toml` and the environment.
pub fn load_config() -> Result<AppConfig, StartupError> {
    AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, draining connections");
}

/// Bind and serve until Ctrl+C. In-flight requests are allowed to finish.
pub async fn run(cfg: AppConfig) -> Result<(), StartupError> {
    let app = build_app(&cfg)?;
    let bind = cfg.server.bind_addr();
    let listener = TcpListener::bind(bind.as_str())
        .await
        .map_err(|source| StartupError::Bind { addr: bind.clone(), source })?;
    let addr = listener.local_addr()?;
    info!(
        %addr,
        account_service = %cfg.providers.account_service.base_url,
        token_service = %cfg.providers.token_service.base_url,
        "auth gateway listening"
    );
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
