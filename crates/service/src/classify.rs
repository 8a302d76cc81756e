//! Response categories and the message-based classification table.

use reqwest::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    BadGateway,
    Internal,
}

impl ErrorCategory {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCategory::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCategory::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Conflict => StatusCode::CONFLICT,
            ErrorCategory::BadGateway => StatusCode::BAD_GATEWAY,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ErrorCategory::BadRequest => "Bad Request",
            ErrorCategory::Unauthorized => "Unauthorized",
            ErrorCategory::NotFound => "Not Found",
            ErrorCategory::Conflict => "Conflict",
            ErrorCategory::BadGateway => "Bad Gateway",
            ErrorCategory::Internal => "Internal Server Error",
        }
    }
}

/// First match wins, compared case-insensitively.
pub fn classify_message(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    if lower.contains("not found") {
        ErrorCategory::NotFound
    } else if lower.contains("invalid credentials") {
        ErrorCategory::Unauthorized
    } else if lower.contains("already exists") {
        ErrorCategory::Conflict
    } else {
        ErrorCategory::BadRequest
    }
}

/// Classify a downstream non-2xx response. Server errors are the gateway's
/// problem, not the caller's. Otherwise the message decides, and the status
/// code is only consulted when the message gives no hint.
pub fn classify_rejection(status: StatusCode, message: &str) -> ErrorCategory {
    if status.is_server_error() {
        return ErrorCategory::BadGateway;
    }
    match classify_message(message) {
        ErrorCategory::BadRequest => match status {
            StatusCode::NOT_FOUND => ErrorCategory::NotFound,
            StatusCode::CONFLICT => ErrorCategory::Conflict,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorCategory::Unauthorized,
            _ => ErrorCategory::BadRequest,
        },
        hinted => hinted,
    }
}
