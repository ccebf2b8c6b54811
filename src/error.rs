//! Error types for Chute.
//!
//! Uses thiserror for ergonomic error definitions that integrate
//! with axum's response system.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

/// One backend's labeled failure inside an aggregate error.
///
/// The label identifies which credential path failed ("bot" or "webhook")
/// so operators can tell the attempts apart without inspecting logs.
#[derive(Debug, Clone)]
pub struct BackendFailure {
    pub backend: &'static str,
    pub message: String,
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.message)
    }
}

/// Join labeled backend failures into a single operator-readable message.
pub(crate) fn join_failures(failures: &[BackendFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Auth errors
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid token")]
    InvalidToken,

    // Resource errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Backend configuration / failover errors
    #[error("No storage backend configured")]
    NoBackendConfigured,

    #[error("All configured backends failed: {}", join_failures(.0))]
    BackendsFailed(Vec<BackendFailure>),

    // External service errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Discord API error: {0}")]
    Discord(String),

    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("Bucket error: {0}")]
    Bucket(String),

    // File errors
    #[error("File too large: max {max_size} bytes")]
    FileTooLarge { max_size: usize },

    #[error("File not found: {0}")]
    FileNotFound(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 401
            Self::Unauthenticated | Self::InvalidToken => StatusCode::UNAUTHORIZED,

            // 404
            Self::NotFound(_) | Self::FileNotFound(_) => StatusCode::NOT_FOUND,

            // 400
            Self::Validation(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,

            // 413
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 503
            Self::NoBackendConfigured => StatusCode::SERVICE_UNAVAILABLE,

            // 502
            Self::BackendsFailed(_) | Self::Discord(_) | Self::Webhook(_) => {
                StatusCode::BAD_GATEWAY
            }

            // 500
            Self::Database(_) | Self::Bucket(_) | Self::Internal(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NoBackendConfigured => "NO_BACKEND_CONFIGURED",
            Self::BackendsFailed(_) => "BACKENDS_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Discord(_) => "DISCORD_ERROR",
            Self::Webhook(_) => "WEBHOOK_ERROR",
            Self::Bucket(_) => "BUCKET_ERROR",
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Other(_) => "UNKNOWN_ERROR",
        }
    }

    /// The per-backend failure list, when this is an aggregate error.
    ///
    /// Kept as a structured list rather than a single opaque string so the
    /// attempts stay individually inspectable.
    pub fn backend_failures(&self) -> Option<&[BackendFailure]> {
        match self {
            Self::BackendsFailed(failures) => Some(failures),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

// Convenience conversions
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Internal(format!("HTTP request failed: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backends_failed_message_concatenates_labels() {
        let err = Error::BackendsFailed(vec![
            BackendFailure {
                backend: "bot",
                message: "Discord API error 403: Missing Access".into(),
            },
            BackendFailure {
                backend: "webhook",
                message: "connection refused".into(),
            },
        ]);

        let rendered = err.to_string();
        assert!(rendered.contains("bot: Discord API error 403: Missing Access"));
        assert!(rendered.contains("webhook: connection refused"));
        assert!(rendered.contains("; "));
    }

    #[test]
    fn test_backend_failures_accessor() {
        let err = Error::BackendsFailed(vec![BackendFailure {
            backend: "bot",
            message: "timeout".into(),
        }]);
        let failures = err.backend_failures().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].backend, "bot");

        assert!(Error::NoBackendConfigured.backend_failures().is_none());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::NoBackendConfigured.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::BackendsFailed(vec![]).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::FileNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
