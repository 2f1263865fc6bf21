//! Error handling module
//!
//! Defines the server-side error types used by the proxy

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application error types
///
/// Every failure of the proxy route maps onto one of these; upstream
/// transport and body failures are folded into `UpstreamUnreachable` so
/// the client sees a uniform message.
#[derive(Error, Debug)]
pub enum AppError {
    /// Provider name is not in the known provider table
    #[error("Unknown provider: \"{provider}\". Available providers: {available}")]
    UnknownProvider { provider: String, available: String },

    /// Provider is known but its base URL environment variable is unset
    #[error("Provider \"{provider}\" is not configured. Missing environment variable: {env_var}")]
    ProviderNotConfigured { provider: String, env_var: String },

    /// Provider base URL does not parse as a URL
    #[error("Invalid URL for provider \"{provider}\". Check {env_var} value: \"{value}\"")]
    InvalidProviderUrl {
        provider: String,
        env_var: String,
        value: String,
    },

    /// Backend unreachable, timed out, or returned a non-JSON body
    #[error("Failed to connect to {provider} service")]
    UpstreamUnreachable { provider: String },
}

/// Structured JSON body of every proxy-originated error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ProxyErrorBody {
    /// Always false for errors
    pub success: bool,
    /// Error message
    pub message: String,
    /// Always null for errors
    pub data: Option<serde_json::Value>,
}

impl ProxyErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

impl AppError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::UnknownProvider { .. } => StatusCode::BAD_REQUEST,
            AppError::ProviderNotConfigured { .. } | AppError::InvalidProviderUrl { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Whether the underlying cause should be logged at error level
    ///
    /// Upstream failures carry backend details that must stay server-side;
    /// the client only ever sees the uniform message.
    pub fn should_log_details(&self) -> bool {
        !matches!(self, AppError::UnknownProvider { .. })
    }
}

/// Allow errors to be returned directly as HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.should_log_details() {
            tracing::error!("Proxy error: {} - Status code: {}", self, status);
        } else {
            tracing::warn!("Client error: {} - Status code: {}", self, status);
        }

        (status, Json(ProxyErrorBody::new(self.to_string()))).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;
