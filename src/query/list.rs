//! List reads
//!
//! Fetches a collection resource with pagination, filtering and sorting,
//! shaping the wire query through the provider's transforms and caching
//! the normalized envelope.

use crate::api::client::RequestOptions;
use crate::api::types::{
    ApiClientError, ApiListResponse, FilterParams, PaginationMeta, PaginationParams, SortParams,
};
use crate::providers::{get_provider, DataProvider, DEFAULT_PROVIDER};
use crate::query::cache::QueryKey;
use crate::query::QueryClient;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Options for a list read
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// Resource name (e.g. "contributors")
    pub resource: String,
    /// Data provider to use (defaults to "core")
    pub data_provider: Option<String>,
    /// Pagination parameters
    pub pagination: Option<PaginationParams>,
    /// Filter parameters, passed through unshaped
    pub filters: Option<FilterParams>,
    /// Sort parameters
    pub sort: Option<SortParams>,
    /// When false, serve the cache (or the empty default) without fetching
    pub enabled: bool,
    /// Cooperative cancellation signal
    pub cancel: Option<CancellationToken>,
}

impl ListOptions {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            data_provider: None,
            pagination: None,
            filters: None,
            sort: None,
            enabled: true,
            cancel: None,
        }
    }
}

/// Result of a list read
///
/// `data` and `total` are defaulted so callers never need null guards.
#[derive(Debug, Clone)]
pub struct ListResult<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub meta: Option<PaginationMeta>,
}

impl<T> Default for ListResult<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            meta: None,
        }
    }
}

/// Shape the wire query using the provider's transforms
///
/// Pagination and sort go through the provider; filters pass through as-is
/// with empty values dropped. Order is pagination, filters, sort.
fn build_query_params(
    provider: &Arc<dyn DataProvider>,
    pagination: &Option<PaginationParams>,
    filters: &Option<FilterParams>,
    sort: &Option<SortParams>,
) -> Vec<(String, String)> {
    let mut params = Vec::new();

    if let Some(pagination) = pagination {
        params.extend(provider.transform_pagination(pagination));
    }

    if let Some(filters) = filters {
        for (key, value) in filters {
            if !value.is_empty() {
                params.push((key.clone(), value.to_query_value()));
            }
        }
    }

    if let Some(sort) = sort {
        params.extend(provider.transform_sort(sort));
    }

    params
}

impl QueryClient {
    /// Fetch a collection of resources
    ///
    /// The cache key covers provider, resource and a structural fingerprint
    /// of pagination, filters and sort, so distinct queries never share a
    /// slot and equal ones always do.
    pub async fn list<T: DeserializeOwned>(
        &self,
        options: &ListOptions,
    ) -> Result<ListResult<T>, ApiClientError> {
        let provider_name = options
            .data_provider
            .as_deref()
            .unwrap_or(DEFAULT_PROVIDER);
        let provider = get_provider(provider_name)?;

        let key = QueryKey::list(
            provider_name,
            &options.resource,
            &options.pagination,
            &options.filters,
            &options.sort,
        );

        if !options.enabled {
            return match self.cache.peek(&key) {
                Some(value) => into_list_result(value),
                None => Ok(ListResult::default()),
            };
        }

        let params = build_query_params(
            &provider,
            &options.pagination,
            &options.filters,
            &options.sort,
        );

        let envelope = self
            .cache
            .get_or_fetch(
                &key,
                || {
                    let provider = provider.clone();
                    let params = params.clone();
                    let request = RequestOptions {
                        provider: Some(provider_name.to_string()),
                        ..Default::default()
                    };
                    async move {
                        let raw = self.api.raw(&options.resource, request, &params).await?;
                        let normalized = provider.transform_list_response(raw)?;
                        serde_json::to_value(normalized).map_err(|e| {
                            ApiClientError::new(500, format!("Invalid list envelope: {}", e))
                        })
                    }
                },
                options.cancel.as_ref(),
            )
            .await?;

        into_list_result(envelope)
    }
}

fn into_list_result<T: DeserializeOwned>(envelope: Value) -> Result<ListResult<T>, ApiClientError> {
    let envelope: ApiListResponse<T> = serde_json::from_value(envelope)
        .map_err(|e| ApiClientError::new(500, format!("Invalid list envelope: {}", e)))?;

    Ok(ListResult {
        total: envelope.meta.total,
        meta: Some(envelope.meta),
        data: envelope.data,
    })
}
