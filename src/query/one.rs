//! Single reads
//!
//! Fetches a single resource (non-paginated response) and returns the
//! unwrapped payload; the envelope's success/message are discarded at
//! this layer.

use crate::api::client::RequestOptions;
use crate::api::types::{ApiClientError, ApiResponse};
use crate::providers::{get_provider, DEFAULT_PROVIDER};
use crate::query::cache::QueryKey;
use crate::query::QueryClient;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Options for a single read
#[derive(Debug, Clone)]
pub struct OneOptions {
    /// Resource path (e.g. "settings", "contributors/123")
    pub resource: String,
    /// Data provider to use (defaults to "core")
    pub data_provider: Option<String>,
    /// When false, serve the cache (or nothing) without fetching
    pub enabled: bool,
    /// Cooperative cancellation signal
    pub cancel: Option<CancellationToken>,
}

impl OneOptions {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            data_provider: None,
            enabled: true,
            cancel: None,
        }
    }
}

impl QueryClient {
    /// Fetch a single resource and unwrap its payload
    ///
    /// Cache key is `[provider, resource, "one"]`. Returns `None` only for
    /// a disabled query with no cached value.
    pub async fn one<T: DeserializeOwned>(
        &self,
        options: &OneOptions,
    ) -> Result<Option<T>, ApiClientError> {
        let provider_name = options
            .data_provider
            .as_deref()
            .unwrap_or(DEFAULT_PROVIDER);
        let provider = get_provider(provider_name)?;

        let key = QueryKey::one(provider_name, &options.resource);

        if !options.enabled {
            return match self.cache.peek(&key) {
                Some(value) => unwrap_payload(value).map(Some),
                None => Ok(None),
            };
        }

        let envelope = self
            .cache
            .get_or_fetch(
                &key,
                || {
                    let provider = provider.clone();
                    let request = RequestOptions {
                        provider: Some(provider_name.to_string()),
                        ..Default::default()
                    };
                    async move {
                        let raw = self.api.raw(&options.resource, request, &[]).await?;
                        let normalized = provider.transform_one_response(raw)?;
                        serde_json::to_value(normalized).map_err(|e| {
                            ApiClientError::new(500, format!("Invalid response envelope: {}", e))
                        })
                    }
                },
                options.cancel.as_ref(),
            )
            .await?;

        unwrap_payload(envelope).map(Some)
    }
}

fn unwrap_payload<T: DeserializeOwned>(envelope: Value) -> Result<T, ApiClientError> {
    let envelope: ApiResponse<T> = serde_json::from_value(envelope)
        .map_err(|e| ApiClientError::new(500, format!("Invalid response envelope: {}", e)))?;
    Ok(envelope.data)
}
