use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use service::observability::encode_metrics;

use crate::context::{propagate_request_id, RequestContext};
use crate::response::{panic_response, render_routing_rejections, ApiError};
use crate::state::AppState;

pub mod auth;
pub mod proxy;

pub async fn health() -> Json<Health> {
    Json(Health::ok())
}

async fn metrics() -> Response {
    let (status, body) = encode_metrics();
    (status, [(CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response()
}

async fn not_found(ctx: RequestContext) -> ApiError {
    ApiError::not_found(&ctx)
}

/// Build the full gateway router: orchestrated auth routes, proxied account
/// and token routes, health and metrics.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let orchestrated = Router::new()
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in))
        .route("/auth/signout", post(auth::sign_out))
        .route("/auth/complete-registration", post(auth::complete_registration));

    let proxied = Router::new()
        .route("/auth/start-registration", post(proxy::start_registration))
        .route("/auth/confirm-email-code", post(proxy::confirm_email_code))
        .route("/auth/validate-credentials", post(proxy::validate_credentials))
        .route("/auth/forgot-password", post(proxy::forgot_password))
        .route("/auth/reset-password", post(proxy::reset_password))
        .route("/auth/generate-token", post(proxy::generate_token))
        .route("/auth/validate-token", post(proxy::validate_token))
        .route("/auth/account/by-email/:email", get(proxy::account_by_email))
        .route(
            "/auth/account/:user_id",
            get(proxy::get_account).put(proxy::update_account).delete(proxy::delete_account),
        )
        .route(
            "/auth/account/:user_id/email-confirmation-token",
            post(proxy::email_confirmation_token),
        );

    let ops = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics));

    orchestrated
        .merge(proxied)
        .merge(ops)
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(render_routing_rejections))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    let request_id = req
                        .extensions()
                        .get::<RequestContext>()
                        .map(|c| c.request_id.clone())
                        .unwrap_or_default();
                    tracing::info_span!("request", method = %req.method(), uri = %req.uri(), %request_id)
                })
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
        .layer(middleware::from_fn(propagate_request_id))
}
