//! Data provider module
//!
//! Defines the DataProvider trait and the immutable provider registry
//!
//! A provider describes how to talk to one backend service: how standard
//! pagination/sort parameters are shaped into its query string and how its
//! raw response bodies are normalized into the standard envelopes. Adding
//! a backend means implementing the trait; the type system forces all four
//! transforms, there is no runtime default.

pub mod core;

use crate::api::types::{ApiClientError, ApiListResponse, ApiResponse, PaginationParams, SortParams};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Default provider name
pub const DEFAULT_PROVIDER: &str = "core";

/// Supported pagination strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationType {
    PageBased,
    OffsetBased,
}

/// Provider-level errors
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Lookup of a name that was never registered
    #[error("Unknown data provider: \"{name}\". Available providers: {available}")]
    Unknown { name: String, available: String },

    /// Backend body did not match the provider's declared response shape
    #[error("Malformed response from provider \"{provider}\": {source}")]
    MalformedResponse {
        provider: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ProviderError> for ApiClientError {
    fn from(error: ProviderError) -> Self {
        ApiClientError::new(500, error.to_string())
    }
}

/// Data provider trait - defines how to communicate with a specific backend
///
/// Transforms are pure; the raw body is an opaque `Value` that is narrowed
/// only inside the provider and never leaks past it untransformed.
pub trait DataProvider: Send + Sync + std::fmt::Debug {
    /// Provider identifier
    fn name(&self) -> &str;

    /// Pagination strategy used by this provider
    fn pagination(&self) -> PaginationType;

    /// Shape standard pagination params into provider query parameters
    fn transform_pagination(&self, params: &PaginationParams) -> Vec<(String, String)>;

    /// Shape standard sort params into provider query parameters
    fn transform_sort(&self, sort: &SortParams) -> Vec<(String, String)>;

    /// Normalize a raw list response body into the standard list envelope
    fn transform_list_response(&self, raw: Value) -> Result<ApiListResponse<Value>, ProviderError>;

    /// Normalize a raw single-item response body into the standard envelope
    fn transform_one_response(&self, raw: Value) -> Result<ApiResponse<Value>, ProviderError>;
}

// Built once at first access, never mutated afterwards.
static PROVIDERS: Lazy<HashMap<&'static str, Arc<dyn DataProvider>>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, Arc<dyn DataProvider>> = HashMap::new();
    table.insert(
        self::core::CoreProvider::NAME,
        Arc::new(self::core::CoreProvider),
    );
    table
});

/// Get a data provider by name
///
/// An unknown name is a hard error enumerating the registered names,
/// never a silently guessed default.
pub fn get_provider(name: &str) -> Result<Arc<dyn DataProvider>, ProviderError> {
    PROVIDERS
        .get(name)
        .cloned()
        .ok_or_else(|| ProviderError::Unknown {
            name: name.to_string(),
            available: provider_names().join(", "),
        })
}

/// Check if a provider exists
pub fn has_provider(name: &str) -> bool {
    PROVIDERS.contains_key(name)
}

/// List all registered provider names, for diagnostics
pub fn provider_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = PROVIDERS.keys().copied().collect();
    names.sort_unstable();
    names
}

pub use self::core::CoreProvider;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_known_provider() {
        let provider = get_provider("core").expect("core provider must be registered");
        assert_eq!(provider.name(), "core");
        assert_eq!(provider.pagination(), PaginationType::PageBased);
    }

    #[test]
    fn test_get_unknown_provider_lists_names() {
        let error = get_provider("doesnotexist").unwrap_err();
        let message = error.to_string();
        assert!(message.contains("doesnotexist"));
        assert!(message.contains("Available providers"));
        assert!(message.contains("core"));
    }

    #[test]
    fn test_has_provider() {
        assert!(has_provider("core"));
        assert!(!has_provider("legacy"));
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(provider_names(), vec!["core"]);
    }
}
