//! Logging middleware
//!
//! Records HTTP request and response information

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Request logging middleware
///
/// Assigns a request id and records method, path, status and latency
/// for each HTTP request
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or("").to_string();

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        path = %path,
        query = %query,
    );

    // The span travels with the future rather than a thread-local guard,
    // so the request id stays attached across suspension points.
    async move {
        info!("Request started: {} {}", method, path);

        let response = next.run(request).await;

        let duration = start_time.elapsed();
        info!(
            "Request completed: {} {} - Status: {} - Duration: {}ms",
            method,
            path,
            response.status(),
            duration.as_millis()
        );

        response
    }
    .instrument(span)
    .await
}
