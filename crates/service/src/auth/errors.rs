use thiserror::Error;
use tracing::warn;

use crate::classify::{classify_message, classify_rejection, ErrorCategory};
use crate::downstream::DownstreamError;
use crate::validation::ValidationError;

/// Why a token could not be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFailure {
    /// The token service answered but refused or returned no usable token.
    Refused,
    /// The token service could not be reached.
    Unreachable,
    /// The token service answered with a body that does not fit the contract.
    Unreadable,
}

/// Business errors for the auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("A bearer token is required in the Authorization header.")]
    MissingBearerToken,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Rejected(String),
    #[error("UserId could not be extracted from the account service response.")]
    UserIdMissing,
    #[error("Could not generate access token.")]
    TokenGenerationFailed(TokenFailure),
    #[error("An upstream service is unavailable.")]
    DownstreamUnavailable,
    #[error("An upstream service returned an unreadable response.")]
    DownstreamBadResponse,
    #[error("internal error: {0}")]
    Internal(String),
}

const REJECTED_FALLBACK: &str = "The account service rejected the request.";

impl AuthError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::Validation(_) | AuthError::Rejected(_) | AuthError::UserIdMissing => {
                ErrorCategory::BadRequest
            }
            AuthError::InvalidCredentials | AuthError::MissingBearerToken => ErrorCategory::Unauthorized,
            AuthError::NotFound(_) => ErrorCategory::NotFound,
            AuthError::Conflict(_) => ErrorCategory::Conflict,
            AuthError::TokenGenerationFailed(TokenFailure::Refused) | AuthError::Internal(_) => {
                ErrorCategory::Internal
            }
            AuthError::TokenGenerationFailed(_)
            | AuthError::DownstreamUnavailable
            | AuthError::DownstreamBadResponse => ErrorCategory::BadGateway,
        }
    }

    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(v) => v.code(),
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::MissingBearerToken => "UNAUTHORIZED",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::Conflict(_) => "CONFLICT",
            AuthError::Rejected(_) => "BAD_REQUEST",
            AuthError::UserIdMissing => "USER_ID_MISSING",
            AuthError::TokenGenerationFailed(_) => "TOKEN_FAILED",
            AuthError::DownstreamUnavailable => "DOWNSTREAM_UNAVAILABLE",
            AuthError::DownstreamBadResponse => "DOWNSTREAM_BAD_RESPONSE",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Text safe to show a client. Internal details stay in the logs.
    pub fn public_detail(&self) -> String {
        match self {
            AuthError::Internal(_) => "An unexpected error occurred.".to_string(),
            other => other.to_string(),
        }
    }

    /// Map an account-service failure onto the taxonomy. A bare 401/403 here
    /// means the gateway's own access key was refused, not the caller's.
    pub fn from_account(err: DownstreamError) -> Self {
        match &err {
            DownstreamError::TransportFailure(_) => AuthError::DownstreamUnavailable,
            DownstreamError::DeserializationFailure { .. } => AuthError::DownstreamBadResponse,
            DownstreamError::NonSuccessStatus { status, .. } => {
                let message = err.rejection_message().unwrap_or_else(|| REJECTED_FALLBACK.to_string());
                match classify_rejection(*status, &message) {
                    ErrorCategory::NotFound => AuthError::NotFound(message),
                    ErrorCategory::Conflict => AuthError::Conflict(message),
                    ErrorCategory::Unauthorized if classify_message(&message) == ErrorCategory::Unauthorized => {
                        AuthError::InvalidCredentials
                    }
                    ErrorCategory::Unauthorized => {
                        warn!(%status, "account service refused the gateway's access key");
                        AuthError::DownstreamUnavailable
                    }
                    ErrorCategory::BadGateway | ErrorCategory::Internal => AuthError::DownstreamUnavailable,
                    ErrorCategory::BadRequest => AuthError::Rejected(message),
                }
            }
        }
    }

    /// Credential checks collapse every client-side rejection into
    /// `InvalidCredentials` so callers cannot probe which part was wrong.
    pub fn from_credentials_check(err: DownstreamError) -> Self {
        match &err {
            DownstreamError::NonSuccessStatus { status, .. } if status.is_client_error() => {
                AuthError::InvalidCredentials
            }
            _ => Self::from_account(err),
        }
    }

    pub fn from_token(err: DownstreamError) -> Self {
        let failure = match &err {
            DownstreamError::TransportFailure(_) => TokenFailure::Unreachable,
            DownstreamError::DeserializationFailure { .. } => TokenFailure::Unreadable,
            DownstreamError::NonSuccessStatus { status, .. } if status.is_server_error() => {
                TokenFailure::Unreachable
            }
            DownstreamError::NonSuccessStatus { .. } => TokenFailure::Refused,
        };
        warn!(error = %err, ?failure, "token service call failed");
        AuthError::TokenGenerationFailed(failure)
    }
}
