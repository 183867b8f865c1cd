//! Error types for the offline cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Offline Error Enum ==
/// Unified error type for the offline cache and its HTTP surface.
#[derive(Error, Debug)]
pub enum OfflineError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Offline and nothing cached to serve
    #[error("Offline: no cached data available for '{0}'")]
    OfflineNoCache(String),

    /// A fetch or deferred operation failed
    #[error("Request failed: {0}")]
    Request(anyhow::Error),

    /// A queued request was discarded before it ran
    #[error("Queued request was dropped before it could run")]
    RequestDropped,

    /// Payload could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for OfflineError {
    fn into_response(self) -> Response {
        let status = match &self {
            OfflineError::NotFound(_) => StatusCode::NOT_FOUND,
            OfflineError::OfflineNoCache(_) => StatusCode::SERVICE_UNAVAILABLE,
            OfflineError::Request(_) => StatusCode::BAD_GATEWAY,
            OfflineError::RequestDropped => StatusCode::SERVICE_UNAVAILABLE,
            OfflineError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OfflineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the offline cache.
pub type Result<T> = std::result::Result<T, OfflineError>;
