//! Account and token endpoints forwarded verbatim.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::Method,
    response::Response,
};
use configs::ServiceTarget;
use service::auth::AuthError;
use tracing::warn;

use crate::{
    context::RequestContext,
    response::{passthrough, ApiError},
    state::AppState,
};

async fn forward(
    state: &AppState,
    ctx: &RequestContext,
    target: ServiceTarget,
    method: Method,
    segments: &[&str],
    body: Option<Bytes>,
) -> Result<Response, ApiError> {
    match state.proxy.forward(target, method, segments, body).await {
        Ok(resp) => Ok(passthrough(resp)),
        Err(e) => {
            warn!(%target, error = %e, "proxy forward failed");
            Err(ApiError::new(&AuthError::DownstreamUnavailable, ctx))
        }
    }
}

pub async fn start_registration(State(state): State<AppState>, ctx: RequestContext, body: Bytes) -> Result<Response, ApiError> {
    forward(&state, &ctx, ServiceTarget::AccountService, Method::POST, &["accounts", "start-registration"], Some(body)).await
}

pub async fn confirm_email_code(State(state): State<AppState>, ctx: RequestContext, body: Bytes) -> Result<Response, ApiError> {
    forward(&state, &ctx, ServiceTarget::AccountService, Method::POST, &["accounts", "confirm-email-code"], Some(body)).await
}

pub async fn get_account(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    forward(&state, &ctx, ServiceTarget::AccountService, Method::GET, &["accounts", user_id.as_str()], None).await
}

pub async fn update_account(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    forward(&state, &ctx, ServiceTarget::AccountService, Method::PUT, &["accounts", user_id.as_str()], Some(body)).await
}

pub async fn delete_account(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    forward(&state, &ctx, ServiceTarget::AccountService, Method::DELETE, &["accounts", user_id.as_str()], None).await
}

pub async fn account_by_email(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(email): Path<String>,
) -> Result<Response, ApiError> {
    forward(&state, &ctx, ServiceTarget::AccountService, Method::GET, &["accounts", "by-email", email.as_str()], None).await
}

pub async fn email_confirmation_token(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    forward(
        &state,
        &ctx,
        ServiceTarget::AccountService,
        Method::POST,
        &["accounts", user_id.as_str(), "email-confirmation-token"],
        Some(body),
    )
    .await
}

pub async fn validate_credentials(State(state): State<AppState>, ctx: RequestContext, body: Bytes) -> Result<Response, ApiError> {
    forward(&state, &ctx, ServiceTarget::AccountService, Method::POST, &["accounts", "validate"], Some(body)).await
}

pub async fn forgot_password(State(state): State<AppState>, ctx: RequestContext, body: Bytes) -> Result<Response, ApiError> {
    forward(&state, &ctx, ServiceTarget::AccountService, Method::POST, &["accounts", "forgot-password"], Some(body)).await
}

pub async fn reset_password(State(state): State<AppState>, ctx: RequestContext, body: Bytes) -> Result<Response, ApiError> {
    forward(&state, &ctx, ServiceTarget::AccountService, Method::POST, &["accounts", "reset-password"], Some(body)).await
}

pub async fn generate_token(State(state): State<AppState>, ctx: RequestContext, body: Bytes) -> Result<Response, ApiError> {
    forward(&state, &ctx, ServiceTarget::TokenService, Method::POST, &["GenerateToken"], Some(body)).await
}

pub async fn validate_token(State(state): State<AppState>, ctx: RequestContext, body: Bytes) -> Result<Response, ApiError> {
    forward(&state, &ctx, ServiceTarget::TokenService, Method::POST, &["validate-token"], Some(body)).await
}
