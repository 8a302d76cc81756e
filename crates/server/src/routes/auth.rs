//! Orchestrated auth endpoints.

use axum::{
    body::{to_bytes, Bytes},
    extract::{Request, State},
    http::header::AUTHORIZATION,
    response::Response,
};
use service::{auth::AuthError, validation::ValidationError};
use tracing::warn;

use crate::{
    context::RequestContext,
    response::{success, ApiError},
    state::AppState,
};

/// Largest sign-out body read into memory.
const SIGN_OUT_BODY_LIMIT: usize = 64 * 1024;

pub async fn sign_up(State(state): State<AppState>, ctx: RequestContext, body: Bytes) -> Result<Response, ApiError> {
    let result = state.auth.sign_up(&body).await.map_err(|e| ApiError::new(&e, &ctx))?;
    Ok(success(&result))
}

pub async fn sign_in(State(state): State<AppState>, ctx: RequestContext, body: Bytes) -> Result<Response, ApiError> {
    let result = state.auth.sign_in(&body).await.map_err(|e| ApiError::new(&e, &ctx))?;
    Ok(success(&result))
}

pub async fn complete_registration(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Response, ApiError> {
    let result = state
        .auth
        .complete_registration(&body)
        .await
        .map_err(|e| ApiError::new(&e, &ctx))?;
    Ok(success(&result))
}

/// The bearer token is checked before the body is touched.
pub async fn sign_out(State(state): State<AppState>, ctx: RequestContext, req: Request) -> Result<Response, ApiError> {
    let has_bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .is_some();
    if !has_bearer {
        warn!("sign-out without bearer token");
        return Err(ApiError::new(&AuthError::MissingBearerToken, &ctx));
    }

    let body = to_bytes(req.into_body(), SIGN_OUT_BODY_LIMIT).await.map_err(|e| {
        ApiError::new(&AuthError::Validation(ValidationError::MalformedJson(e.to_string())), &ctx)
    })?;
    let ack = state.auth.sign_out(&body).await.map_err(|e| ApiError::new(&e, &ctx))?;
    Ok(success(&ack))
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::bearer_token;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
