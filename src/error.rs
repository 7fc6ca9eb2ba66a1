use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Failure talking to an upstream provider (search or weather).
///
/// Only the HTTP status of a non-success reply is ever relayed to clients.
/// Transport and decoding failures are logged and replaced with the
/// endpoint's friendly message.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{provider} API returned status code {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} response could not be decoded: {detail}")]
    Decode {
        provider: &'static str,
        detail: String,
    },

    #[error("{0} API key not configured")]
    NotConfigured(&'static str),
}

/// Application-wide error types with appropriate HTTP status codes.
///
/// Every variant renders as `{"success": false, "error": "..."}`. Messages
/// are written to be read aloud by the voice agent, so they stay short and
/// never carry provider payloads or internal details.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed request field.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Access Gate denial. Missing and invalid keys are indistinguishable.
    #[error("Invalid or missing API key")]
    Unauthorized,

    /// Admission Limiter denial.
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    QuotaExceeded { retry_after_secs: u64 },

    /// Upstream provider failure. `fallback` is spoken when the failure
    /// is not a plain status code.
    #[error("Upstream failure: {source}")]
    Upstream {
        #[source]
        source: UpstreamError,
        fallback: &'static str,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Wrap an upstream failure with the message spoken for opaque errors.
    pub fn upstream(source: UpstreamError, fallback: &'static str) -> Self {
        AppError::Upstream { source, fallback }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream { .. } | AppError::Internal(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Unauthorized => UNAUTHORIZED_MESSAGE.to_string(),
            AppError::QuotaExceeded { .. } => QUOTA_EXCEEDED_MESSAGE.to_string(),
            AppError::Upstream { source, fallback } => match source {
                UpstreamError::Status { .. } | UpstreamError::NotConfigured(_) => {
                    source.to_string()
                }
                UpstreamError::Transport { .. } | UpstreamError::Decode { .. } => {
                    (*fallback).to_string()
                }
            },
            AppError::Internal(_) => "Sorry, something went wrong on my end.".to_string(),
            AppError::Config(_) => "Service configuration error.".to_string(),
        }
    }
}

/// Spoken message for Access Gate denials.
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid or missing API key";

/// Out-of-band hint attached to Access Gate denials.
pub const UNAUTHORIZED_HINT: &str = "Contact the service operator to request access.";

/// Spoken message for Admission Limiter denials.
pub const QUOTA_EXCEEDED_MESSAGE: &str = "Too many requests. Please wait a moment and try again.";

/// Uniform failure body for every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            hint: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Full details stay in the logs; clients get the public message only
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let mut body = ErrorBody::new(self.public_message());

        match self {
            AppError::Unauthorized => {
                body.hint = Some(UNAUTHORIZED_HINT);
                (
                    status,
                    [(axum::http::header::WWW_AUTHENTICATE, "API-Key")],
                    axum::Json(body),
                )
                    .into_response()
            }
            AppError::QuotaExceeded { retry_after_secs } => (
                status,
                [(axum::http::header::RETRY_AFTER, retry_after_secs.to_string())],
                axum::Json(body),
            )
                .into_response(),
            _ => (status, axum::Json(body)).into_response(),
        }
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
