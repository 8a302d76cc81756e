//! The single failure envelope written for every error response.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::AuthError;
use crate::classify::ErrorCategory;

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// `{succeeded:false, message, code, type, title, status, detail, extensions}`.
/// `succeeded` and `message` serve clients of the simple envelope; the rest
/// follows RFC 7807.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemDetail {
    pub succeeded: bool,
    pub message: String,
    pub code: &'static str,
    /// `Status:{status}:{name}:{code}`, e.g. `Status:404:NotFound:not_found`.
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: &'static str,
    pub status: u16,
    pub detail: String,
    pub extensions: Map<String, Value>,
}

impl ProblemDetail {
    pub fn new(category: ErrorCategory, code: &'static str, detail: impl Into<String>) -> Self {
        Self::build(category.status().as_u16(), category.title(), code, detail.into())
    }

    /// For statuses outside the error taxonomy, such as routing rejections.
    pub fn for_status(status: StatusCode, code: &'static str, detail: impl Into<String>) -> Self {
        Self::build(status.as_u16(), status.canonical_reason().unwrap_or("Error"), code, detail.into())
    }

    fn build(status: u16, title: &'static str, code: &'static str, detail: String) -> Self {
        Self {
            succeeded: false,
            message: detail.clone(),
            code,
            problem_type: problem_type(status, code),
            title,
            status,
            detail,
            extensions: Map::new(),
        }
    }

    pub fn from_error(err: &AuthError) -> Self {
        let mut problem = Self::new(err.category(), err.code(), err.public_detail());
        if let AuthError::Validation(v) = err {
            problem.extensions.insert("errors".into(), v.field_errors());
        }
        problem
    }

    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.extensions.insert("requestId".into(), Value::String(request_id.to_string()));
        self
    }

    pub fn with_trace_id(mut self, trace_id: Option<&str>) -> Self {
        if let Some(id) = trace_id {
            self.extensions.insert("traceId".into(), Value::String(id.to_string()));
        }
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

fn problem_type(status: u16, code: &str) -> String {
    let name = match status {
        400 => "BadRequest".to_string(),
        401 => "Unauthorized".to_string(),
        403 => "Forbidden".to_string(),
        404 => "NotFound".to_string(),
        500 => "InternalServerError".to_string(),
        other => other.to_string(),
    };
    format!("Status:{status}:{name}:{}", code.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn validation_problem_lists_the_field() {
        let err = AuthError::from(ValidationError::MissingRequiredField("firstName"));
        let body = serde_json::to_value(
            ProblemDetail::from_error(&err).with_request_id("req-1").with_trace_id(Some("abc")),
        )
        .unwrap();
        assert_eq!(body["succeeded"], false);
        assert_eq!(body["status"], 400);
        assert_eq!(body["code"], "FIELD_REQUIRED");
        assert_eq!(body["title"], "Bad Request");
        assert_eq!(body["type"], "Status:400:BadRequest:field_required");
        assert_eq!(body["message"], "The firstName field is required.");
        assert_eq!(body["extensions"]["requestId"], "req-1");
        assert_eq!(body["extensions"]["traceId"], "abc");
        assert!(body["extensions"]["errors"]["firstName"].is_array());
    }

    #[test]
    fn status_follows_category() {
        let problem = ProblemDetail::from_error(&AuthError::DownstreamUnavailable).with_trace_id(None);
        assert_eq!(problem.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!problem.extensions.contains_key("traceId"));
        assert!(!problem.extensions.contains_key("errors"));
        // statuses without a short name keep the number
        assert_eq!(problem.problem_type, "Status:502:502:downstream_unavailable");
    }

    #[test]
    fn routing_rejections_use_the_reason_phrase() {
        let problem = ProblemDetail::for_status(StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED", "nope");
        assert_eq!(problem.status, 405);
        assert_eq!(problem.title, "Method Not Allowed");
        assert_eq!(problem.problem_type, "Status:405:405:method_not_allowed");
    }
}
