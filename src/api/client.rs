//! API client
//!
//! Thin typed wrapper over reqwest that talks to the BFF proxy. All
//! requests go through `/api/proxy/{provider}/{path}`, which handles auth
//! injection and forwards to the real backend.

use crate::api::types::{ApiClientError, ApiErrorBody, ApiResponse};
use crate::providers::DEFAULT_PROVIDER;
use anyhow::{Context, Result};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Options for a single proxy request
#[derive(Debug, Default, Clone)]
pub struct RequestOptions {
    /// HTTP method (default GET)
    pub method: Option<Method>,
    /// JSON body, serialized only for non-GET methods
    pub body: Option<Value>,
    /// Data provider to use (defaults to "core")
    pub provider: Option<String>,
    /// Cooperative cancellation signal
    pub cancel: Option<CancellationToken>,
}

/// Typed HTTP client against the BFF proxy
///
/// Provider-agnostic: it only knows how to talk to the proxy, never to a
/// real backend directly.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    origin: String,
}

impl ApiClient {
    /// Create a client against the given proxy origin (e.g. `http://localhost:3080`)
    pub fn new(origin: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("bffproxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            origin: origin.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build the proxy URL for a resource path, stripping a leading slash
    fn build_url(&self, provider: &str, path: &str) -> String {
        let clean_path = path.trim_start_matches('/');
        format!("{}/api/proxy/{}/{}", self.origin, provider, clean_path)
    }

    /// Make a request and return the raw, untransformed JSON body
    ///
    /// Transformation is the provider's job, applied one layer up.
    pub async fn raw(
        &self,
        path: &str,
        options: RequestOptions,
        params: &[(String, String)],
    ) -> Result<Value, ApiClientError> {
        let method = options.method.unwrap_or(Method::GET);
        let provider = options.provider.as_deref().unwrap_or(DEFAULT_PROVIDER);
        let url = self.build_url(provider, path);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");

        let query = retained_params(params);
        if !query.is_empty() {
            request = request.query(&query);
        }

        if method != Method::GET {
            if let Some(body) = &options.body {
                request = request.json(body);
            }
        }

        let send = request.send();
        let response = match &options.cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => return Err(ApiClientError::cancelled()),
                result = send => result,
            },
            None => send.await,
        }
        .map_err(|e| ApiClientError::new(0, format!("Network error: {}", e)))?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let body = response.json::<ApiErrorBody>().await.ok();
            return Err(ApiClientError::from_error_body(status, body));
        }

        // Empty responses (204 No Content) short-circuit body parsing
        if status == 204 {
            return Ok(Value::Null);
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ApiClientError::new(status, format!("Invalid response body: {}", e)))
    }

    /// GET request returning the standard envelope
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<ApiResponse<T>, ApiClientError> {
        let raw = self.raw(path, RequestOptions::default(), params).await?;
        deserialize_envelope(raw)
    }

    /// POST request returning the standard envelope
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ApiClientError> {
        let options = RequestOptions {
            method: Some(Method::POST),
            body: Some(to_body(body)?),
            ..Default::default()
        };
        let raw = self.raw(path, options, &[]).await?;
        deserialize_envelope(raw)
    }

    /// PUT request returning the standard envelope
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ApiClientError> {
        let options = RequestOptions {
            method: Some(Method::PUT),
            body: Some(to_body(body)?),
            ..Default::default()
        };
        let raw = self.raw(path, options, &[]).await?;
        deserialize_envelope(raw)
    }

    /// PATCH request returning the standard envelope
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ApiClientError> {
        let options = RequestOptions {
            method: Some(Method::PATCH),
            body: Some(to_body(body)?),
            ..Default::default()
        };
        let raw = self.raw(path, options, &[]).await?;
        deserialize_envelope(raw)
    }

    /// DELETE request returning the standard envelope
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiResponse<T>, ApiClientError> {
        let options = RequestOptions {
            method: Some(Method::DELETE),
            ..Default::default()
        };
        let raw = self.raw(path, options, &[]).await?;
        deserialize_envelope(raw)
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<Value, ApiClientError> {
    serde_json::to_value(body)
        .map_err(|e| ApiClientError::new(0, format!("Invalid request body: {}", e)))
}

fn deserialize_envelope<T: DeserializeOwned>(raw: Value) -> Result<ApiResponse<T>, ApiClientError> {
    serde_json::from_value(raw)
        .map_err(|e| ApiClientError::new(200, format!("Invalid response body: {}", e)))
}

/// Drop query parameters with empty values, keeping the supplied order
///
/// Encoding is reqwest's job; this only decides what goes on the wire.
fn retained_params(params: &[(String, String)]) -> Vec<(&str, &str)> {
    params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_strips_leading_slash() {
        let client = ApiClient::new("http://localhost:3080").unwrap();
        let url = client.build_url("core", "/settings");
        assert_eq!(url, "http://localhost:3080/api/proxy/core/settings");
    }

    #[test]
    fn test_retained_params_drops_empty_preserves_order() {
        let params = vec![
            ("page".to_string(), "2".to_string()),
            ("status".to_string(), "".to_string()),
            ("page_size".to_string(), "10".to_string()),
        ];
        assert_eq!(
            retained_params(&params),
            vec![("page", "2"), ("page_size", "10")]
        );
    }
}
