//! Error types for proxy operations

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Result type for proxy operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Error types for the enrichment proxy
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A configured path expression could not be parsed
    #[error("Invalid path expression '{expression}': {reason}")]
    InvalidPath { expression: String, reason: String },

    /// Embedding provider call failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A document could not be read or written at the requested location
    #[error("Document error at '{path}': {reason}")]
    Document { path: String, reason: String },

    /// Inbound request body could not be read
    #[error("Failed to read request body: {0}")]
    ReadBody(String),

    /// Downstream store could not be reached or answered unreadably
    #[error("Failed to forward request to vector store: {0}")]
    Transport(#[from] reqwest::Error),

    /// Method not allowed on the bulk endpoint
    #[error("Invalid request method: {0}")]
    MethodNotAllowed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ProxyError {
    pub(crate) fn document(path: impl ToString, reason: impl Into<String>) -> Self {
        ProxyError::Document {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// HTTP status reported to the caller for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<String> for ProxyError {
    fn from(s: String) -> Self {
        ProxyError::Other(s)
    }
}

impl From<&str> for ProxyError {
    fn from(s: &str) -> Self {
        ProxyError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for ProxyError {
    fn from(err: anyhow::Error) -> Self {
        ProxyError::Other(err.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
