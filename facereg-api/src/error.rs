//! Error types for facereg-api
//!
//! Relays report a [`RelayError`] regardless of transport. HTTP handlers turn
//! it into an [`ApiError`] (JSON `{"error": ...}` body); the push channel turns
//! it into a sibling error event. Transport and storage details are logged and
//! replaced by a generic message before they reach a client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use facereg_common::api::ErrorBody;
use thiserror::Error;
use tracing::{error, warn};

use crate::services::inference_client::UpstreamError;

/// Failure of a registration or recognition relay call
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or empty required field (400)
    #[error("{0}")]
    Validation(String),

    /// Collaborator reported a structured failure; message is forwarded (400)
    #[error("{0}")]
    Upstream(String),

    /// Collaborator unreachable or answered without a usable body (500)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Encoding record store failure (500)
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) | RelayError::Upstream(_) => StatusCode::BAD_REQUEST,
            RelayError::Transport(_) | RelayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client; internal failures collapse to `generic`
    pub fn public_message(&self, generic: &str) -> String {
        match self {
            RelayError::Validation(msg) | RelayError::Upstream(msg) => msg.clone(),
            RelayError::Transport(_) | RelayError::Storage(_) => generic.to_string(),
        }
    }

    /// Log at a level matching severity
    pub fn log(&self, operation: &str) {
        match self {
            RelayError::Validation(_) | RelayError::Upstream(_) => {
                warn!(operation, error = %self, "Request rejected")
            }
            RelayError::Transport(_) | RelayError::Storage(_) => {
                error!(operation, error = %self, "Request failed")
            }
        }
    }
}

impl From<UpstreamError> for RelayError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Rejected(msg) => RelayError::Upstream(msg),
            other => RelayError::Transport(other.to_string()),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500); message is already client-safe
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Convert a relay failure, logging it under `operation`
    pub fn from_relay(err: RelayError, operation: &str, generic: &str) -> Self {
        err.log(operation);
        let message = err.public_message(generic);
        if err.status() == StatusCode::BAD_REQUEST {
            ApiError::BadRequest(message)
        } else {
            ApiError::Internal(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_details_are_hidden() {
        let err = RelayError::Transport("connection refused (os error 111)".to_string());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message("Failed to register face"), "Failed to register face");
    }

    #[test]
    fn test_upstream_message_is_forwarded() {
        let err: RelayError = UpstreamError::Rejected("No face detected in the image".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message("generic"), "No face detected in the image");
    }

    #[test]
    fn test_unstructured_upstream_failure_is_transport() {
        let err: RelayError = UpstreamError::Status {
            status: 502,
            body: "Bad Gateway".into(),
        }
        .into();
        assert!(matches!(err, RelayError::Transport(_)));
    }

    #[test]
    fn test_api_error_status_codes() {
        let bad = ApiError::from_relay(RelayError::Validation("x".into()), "test", "generic");
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);

        let internal = ApiError::from_relay(RelayError::Transport("x".into()), "test", "generic");
        assert_eq!(internal.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
