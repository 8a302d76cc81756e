//! Writes orchestration results, proxy passthroughs and problems to HTTP.

use std::any::Any;

use axum::{
    body::Body,
    extract::Request,
    http::{
        header::{ALLOW, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use service::{
    auth::AuthError,
    classify::ErrorCategory,
    problem::{ProblemDetail, PROBLEM_CONTENT_TYPE},
    proxy::ProxyResponse,
};
use tracing::error;

use crate::context::RequestContext;

/// Failure of a gateway route, rendered as the problem envelope.
#[derive(Debug)]
pub struct ApiError {
    problem: ProblemDetail,
}

impl ApiError {
    pub fn new(err: &AuthError, ctx: &RequestContext) -> Self {
        Self::from_problem(ProblemDetail::from_error(err), ctx)
    }

    pub fn from_problem(problem: ProblemDetail, ctx: &RequestContext) -> Self {
        Self {
            problem: problem
                .with_request_id(&ctx.request_id)
                .with_trace_id(ctx.trace_id.as_deref()),
        }
    }

    pub fn not_found(ctx: &RequestContext) -> Self {
        Self::from_problem(
            ProblemDetail::new(ErrorCategory::NotFound, "NOT_FOUND", "The requested resource was not found."),
            ctx,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        problem_response(&self.problem)
    }
}

fn json_response(status: StatusCode, content_type: &'static str, body: impl Into<Body>) -> Response {
    let mut resp = Response::new(body.into());
    *resp.status_mut() = status;
    resp.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}

pub fn problem_response(problem: &ProblemDetail) -> Response {
    match serde_json::to_vec(problem) {
        Ok(bytes) => json_response(problem.status_code(), PROBLEM_CONTENT_TYPE, bytes),
        Err(e) => {
            error!(error = %e, "failed to serialize problem");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `200` with the serialized payload.
pub fn success<T: Serialize>(payload: &T) -> Response {
    match serde_json::to_vec(payload) {
        Ok(bytes) => json_response(StatusCode::OK, "application/json", bytes),
        Err(e) => {
            error!(error = %e, "failed to serialize response");
            problem_response(&ProblemDetail::from_error(&AuthError::Internal(e.to_string())))
        }
    }
}

/// Downstream status and bytes, untouched.
pub fn passthrough(resp: ProxyResponse) -> Response {
    json_response(resp.status, resp.content_type, resp.body)
}

/// Rendered by the panic-catching layer. The payload is only logged.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!(panic = %detail, "handler panicked");
    problem_response(&ProblemDetail::from_error(&AuthError::Internal(detail.to_string())))
}

fn is_json(resp: &Response) -> bool {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json") || ct.starts_with(PROBLEM_CONTENT_TYPE))
}

/// Re-render the router's own 405 and 413 replies, which carry an empty or
/// plain-text body, as problems. JSON responses (passthroughs included) are
/// left alone.
pub async fn render_routing_rejections(req: Request, next: Next) -> Response {
    let ctx = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(|| RequestContext::from_headers(req.headers()));
    let resp = next.run(req).await;
    let (code, detail) = match resp.status() {
        StatusCode::METHOD_NOT_ALLOWED => ("METHOD_NOT_ALLOWED", "The HTTP method is not allowed for this resource."),
        StatusCode::PAYLOAD_TOO_LARGE => ("PAYLOAD_TOO_LARGE", "The request body is too large."),
        _ => return resp,
    };
    if is_json(&resp) {
        return resp;
    }

    let allow = resp.headers().get(ALLOW).cloned();
    let mut problem = ApiError::from_problem(ProblemDetail::for_status(resp.status(), code, detail), &ctx).into_response();
    if let Some(allow) = allow {
        problem.headers_mut().insert(ALLOW, allow);
    }
    problem
}
