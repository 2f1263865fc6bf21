//! Health check handlers
//!
//! Provides application health status check endpoints

use crate::handlers::proxy::known_providers;
use axum::response::Json;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service name
    pub service: String,
    /// Version information
    pub version: String,
    /// Timestamp
    pub timestamp: String,
    /// Details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

/// Check result
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthDetails {
    /// Known provider names
    pub providers: Vec<String>,
    /// Uptime in seconds
    pub uptime_seconds: u64,
}

/// Basic health check
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Executing health check");

    let response = HealthResponse {
        status: "healthy".to_string(),
        service: "BFF Proxy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: Some(HealthDetails {
            providers: known_providers().iter().map(|s| s.to_string()).collect(),
            uptime_seconds: START_TIME.elapsed().as_secs(),
        }),
    };

    Json(response)
}

/// Liveness check
///
/// GET /health/live
/// Only checks that the process is responding
pub async fn liveness_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive".to_string(),
        service: "BFF Proxy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: Some(HealthDetails {
            providers: known_providers().iter().map(|s| s.to_string()).collect(),
            uptime_seconds: START_TIME.elapsed().as_secs(),
        }),
    })
}
