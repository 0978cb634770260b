use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::fmt;

use crate::classify::extract_error_message;

/// Banner text shown when a failure carries nothing more specific.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Bad request error (invalid input).
    BadRequest(String),
    /// A form parameter failed client-side validation. No network call was made.
    Validation {
        /// `paramName` of the offending parameter.
        param: String,
        /// Field-specific message for the user.
        message: String,
    },
    /// The aggregator answered with a non-2xx status.
    Upstream {
        /// Status code returned by the aggregator.
        status: u16,
        /// Response body (JSON, or the raw text wrapped as a string).
        body: Value,
    },
    /// The aggregator answered 2xx but the body carries a business error.
    Domain(String),
    /// Transport failure talking to an external API (network, parse).
    ExternalApiError(String),
    /// The wizard cannot perform the requested transition in its current step.
    InvalidTransition(String),
    /// Resource not found error.
    NotFound(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Human-readable text for the single dismissable banner.
    pub fn user_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Validation { message, .. } => message.clone(),
            AppError::Upstream { body, .. } => extract_error_message(body),
            AppError::Domain(msg) => msg.clone(),
            AppError::ExternalApiError(_) | AppError::InternalError(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            AppError::InvalidTransition(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::WithContext { source, .. } => source.user_message(),
        }
    }

    /// Strips any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Validation { param, message } => {
                write!(f, "Validation failed for {}: {}", param, message)
            }
            AppError::Upstream { status, body } => {
                write!(f, "Upstream returned {}: {}", status, body)
            }
            AppError::Domain(msg) => write!(f, "Upstream business error: {}", msg),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::InvalidTransition(msg) => write!(f, "Invalid transition: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Proxy semantics: upstream failures keep the upstream status and wrap
    /// its body as `{error: <body>}`, business errors hidden in a 200 become
    /// 400, and anything unexpected becomes 500 `{error: <message>}`.
    fn into_response(self) -> Response {
        let (status, error_body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!(msg)),
            AppError::Validation { message, .. } => (StatusCode::BAD_REQUEST, json!(message)),
            AppError::Upstream { status, body } => {
                tracing::warn!("Upstream error {}: {}", status, body);
                (
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                    body,
                )
            }
            AppError::Domain(msg) => {
                tracing::warn!("Upstream business error: {}", msg);
                (StatusCode::BAD_REQUEST, json!(msg))
            }
            AppError::ExternalApiError(msg) => {
                tracing::error!("External API error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!(msg))
            }
            AppError::InvalidTransition(msg) => (StatusCode::CONFLICT, json!(msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!(msg)),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!(msg))
            }
            AppError::WithContext { source, context } => {
                // Log full context chain for debugging
                tracing::error!("Error with context: {} -> {}", context, source);
                // Delegate to underlying error's response
                return source.into_response();
            }
        };

        (status, Json(json!({ "error": error_body }))).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApiError(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_keeps_status() {
        let err = AppError::Upstream {
            status: 404,
            body: json!({"status": "Biller not found"}),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_context_delegates_to_source() {
        let err: Result<(), AppError> = Err(AppError::Domain("Invalid vehicle".to_string()));
        let err = err.context("pre-enquiry").unwrap_err();

        assert_eq!(err.user_message(), "Invalid vehicle");
        assert!(matches!(err.root(), AppError::Domain(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transport_failure_hides_details_in_banner() {
        let err = AppError::ExternalApiError("connection refused".to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
