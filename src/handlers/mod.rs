//! HTTP handlers module
//!
//! Contains all HTTP endpoint handling logic

pub mod health;
pub mod proxy;

use crate::config::Settings;
use crate::middleware::logging::request_logging_middleware;
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub http: reqwest::Client,
}

/// Create application router
pub async fn create_router(settings: Settings) -> Result<Router> {
    // Outbound client shared by every proxied request
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.proxy.upstream_timeout))
        .user_agent(concat!("bffproxy/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create upstream HTTP client")?;

    let app_state = Arc::new(AppState {
        settings: settings.clone(),
        http,
    });

    let middleware_stack = ServiceBuilder::new().layer(TraceLayer::new_for_http());

    let mut router = Router::new()
        .route(
            "/api/proxy/:provider/*path",
            get(proxy::proxy_request)
                .post(proxy::proxy_request)
                .put(proxy::proxy_request)
                .patch(proxy::proxy_request)
                .delete(proxy::proxy_request),
        )
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .with_state(app_state)
        .layer(axum::middleware::from_fn(request_logging_middleware))
        .layer(middleware_stack);

    if settings.security.cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    Ok(router)
}
