//! BFF proxy handlers
//!
//! The single trusted point where symbolic provider names are resolved to
//! configured backend base URLs and where the caller's session cookie is
//! translated into a bearer credential for the backend.
//!
//! Route shape: `GET|POST|PUT|PATCH|DELETE /api/proxy/{provider}/{*path}`

use crate::handlers::AppState;
use crate::utils::error::{AppError, AppResult};
use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Known providers and their base URL environment variable names
const PROVIDER_ENV_VARS: &[(&str, &str)] = &[("core", "SVC_CORE_URL")];

/// API path prefix per provider; providers not listed get the default
const PROVIDER_API_PATHS: &[(&str, &str)] = &[("core", "/api")];

/// Default API version path for unlisted providers
const DEFAULT_API_PATH: &str = "/api/v1";

/// Correlation headers forwarded verbatim when present
const FORWARD_HEADERS: &[&str] = &["x-request-id", "x-correlation-id"];

/// Response header naming the provider that served the request
const PROXIED_FROM_HEADER: &str = "X-Proxied-From";

fn provider_env_var(provider: &str) -> Option<&'static str> {
    PROVIDER_ENV_VARS
        .iter()
        .find(|(name, _)| *name == provider)
        .map(|(_, env_var)| *env_var)
}

fn provider_api_path(provider: &str) -> &'static str {
    PROVIDER_API_PATHS
        .iter()
        .find(|(name, _)| *name == provider)
        .map(|(_, path)| *path)
        .unwrap_or(DEFAULT_API_PATH)
}

/// List of known provider names, for error messages
pub fn known_providers() -> Vec<&'static str> {
    PROVIDER_ENV_VARS.iter().map(|(name, _)| *name).collect()
}

/// Resolve a provider name to its configured base URL plus API prefix
///
/// The environment variable is read per request so that configuration
/// problems surface as structured responses instead of startup failures.
fn resolve_provider_base_url(provider: &str) -> AppResult<String> {
    let env_var = provider_env_var(provider).ok_or_else(|| AppError::UnknownProvider {
        provider: provider.to_string(),
        available: known_providers().join(", "),
    })?;

    let base_url = std::env::var(env_var).map_err(|_| AppError::ProviderNotConfigured {
        provider: provider.to_string(),
        env_var: env_var.to_string(),
    })?;

    if reqwest::Url::parse(&base_url).is_err() {
        return Err(AppError::InvalidProviderUrl {
            provider: provider.to_string(),
            env_var: env_var.to_string(),
            value: base_url,
        });
    }

    Ok(format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        provider_api_path(provider)
    ))
}

/// Build the backend URL, forwarding the inbound query string unmodified
fn build_backend_url(provider: &str, path: &str, query: Option<&str>) -> AppResult<String> {
    let base = resolve_provider_base_url(provider)?;
    let endpoint = path.trim_start_matches('/');

    let url = match query {
        Some(query) if !query.is_empty() => format!("{}/{}?{}", base, endpoint, query),
        _ => format!("{}/{}", base, endpoint),
    };

    Ok(url)
}

/// Extract the auth token from the Cookie header, if present
///
/// Absence is not an error: unauthenticated passthrough is allowed and
/// authorization is the backend's concern.
fn extract_auth_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;

    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == cookie_name {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Map the inbound axum method onto the outbound reqwest method
///
/// axum 0.7 and reqwest 0.11 sit on different `http` major versions, so
/// the conversion is spelled out.
fn outbound_method(method: &Method) -> Option<reqwest::Method> {
    match *method {
        Method::GET => Some(reqwest::Method::GET),
        Method::POST => Some(reqwest::Method::POST),
        Method::PUT => Some(reqwest::Method::PUT),
        Method::PATCH => Some(reqwest::Method::PATCH),
        Method::DELETE => Some(reqwest::Method::DELETE),
        Method::HEAD => Some(reqwest::Method::HEAD),
        _ => None,
    }
}

/// Forward one inbound request to the resolved backend
pub async fn proxy_request(
    State(state): State<Arc<AppState>>,
    Path((provider, path)): Path<(String, String)>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    debug!("Proxying {} {}/{}", method, provider, path);

    let backend_url = match build_backend_url(&provider, &path, query.as_deref()) {
        Ok(url) => url,
        Err(e) => return e.into_response(),
    };

    let Some(out_method) = outbound_method(&method) else {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    };

    let mut request = state
        .http
        .request(out_method, &backend_url)
        .header("Content-Type", "application/json")
        .header("Accept", "application/json");

    if let Some(token) = extract_auth_token(&headers, &state.settings.proxy.auth_cookie_name) {
        request = request.header("Authorization", format!("Bearer {}", token));
    }

    for name in FORWARD_HEADERS {
        if let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) {
            request = request.header(*name, value);
        }
    }

    // Non-GET/HEAD requests carry a JSON body when one parses; a missing or
    // malformed body is tolerated and the request proceeds bodiless.
    if method != Method::GET && method != Method::HEAD && !body.is_empty() {
        match serde_json::from_slice::<Value>(&body) {
            Ok(json) => request = request.json(&json),
            Err(e) => warn!("Ignoring malformed request body for {}: {}", provider, e),
        }
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            error!("[Proxy Error] Provider: {} - {}", provider, e);
            return AppError::UpstreamUnreachable { provider }.into_response();
        }
    };

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

    // Empty responses are relayed without body parsing
    if status == StatusCode::NO_CONTENT {
        return StatusCode::NO_CONTENT.into_response();
    }

    match response.json::<Value>().await {
        Ok(data) => (
            status,
            [(PROXIED_FROM_HEADER, provider.as_str())],
            Json(data),
        )
            .into_response(),
        Err(e) => {
            error!("[Proxy Error] Provider: {} - {}", provider, e);
            AppError::UpstreamUnreachable { provider }.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_providers() {
        assert_eq!(known_providers(), vec!["core"]);
    }

    #[test]
    fn test_provider_api_path_default() {
        assert_eq!(provider_api_path("core"), "/api");
        assert_eq!(provider_api_path("anything-else"), "/api/v1");
    }

    #[test]
    fn test_unknown_provider_resolution() {
        let error = resolve_provider_base_url("doesnotexist").unwrap_err();
        assert!(matches!(error, AppError::UnknownProvider { .. }));
        assert!(error.to_string().contains("core"));
    }

    #[test]
    fn test_backend_url_query_forwarding() {
        std::env::set_var("SVC_CORE_URL", "http://localhost:9000");

        let url = build_backend_url("core", "contributors", Some("page=2&page_size=10")).unwrap();
        assert_eq!(
            url,
            "http://localhost:9000/api/contributors?page=2&page_size=10"
        );

        let bare = build_backend_url("core", "settings", None).unwrap();
        assert_eq!(bare, "http://localhost:9000/api/settings");

        std::env::remove_var("SVC_CORE_URL");
    }

    #[test]
    fn test_extract_auth_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "session=abc; auth_token=tok123; theme=dark".parse().unwrap(),
        );

        assert_eq!(
            extract_auth_token(&headers, "auth_token"),
            Some("tok123".to_string())
        );
        assert_eq!(extract_auth_token(&headers, "missing"), None);

        let empty = HeaderMap::new();
        assert_eq!(extract_auth_token(&empty, "auth_token"), None);
    }

    #[test]
    fn test_outbound_method_mapping() {
        assert_eq!(outbound_method(&Method::GET), Some(reqwest::Method::GET));
        assert_eq!(
            outbound_method(&Method::DELETE),
            Some(reqwest::Method::DELETE)
        );
        assert_eq!(outbound_method(&Method::TRACE), None);
    }
}
