//! Data layer types
//!
//! Defines the normalized response envelopes, request parameter types and
//! the client-side error currency shared by the API client and query layer

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Standard API response wrapper format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded
    pub success: bool,
    /// Response payload
    pub data: T,
    /// Optional human-readable message
    #[serde(default)]
    pub message: Option<String>,
}

/// API list response with pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiListResponse<T> {
    /// Whether the request succeeded
    pub success: bool,
    /// Response payload rows
    pub data: Vec<T>,
    /// Pagination metadata
    pub meta: PaginationMeta,
    /// Optional human-readable message
    #[serde(default)]
    pub message: Option<String>,
}

/// Pagination metadata returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaginationMeta {
    /// Total number of items across all pages
    pub total: u64,
}

/// Pagination parameters for list requests
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PaginationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// Sort direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Sort parameters for list requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortParams {
    pub field: String,
    pub order: SortOrder,
}

/// A single query parameter value
///
/// Empty strings are treated as absent and dropped during serialization,
/// matching the behavior callers rely on when wiring optional form state
/// straight into filters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Number(i64),
    Bool(bool),
}

impl ParamValue {
    /// Whether this value should be dropped from the query string
    pub fn is_empty(&self) -> bool {
        matches!(self, ParamValue::String(s) if s.is_empty())
    }

    /// Serialize as a query-string value
    pub fn to_query_value(&self) -> String {
        match self {
            ParamValue::String(s) => s.clone(),
            ParamValue::Number(n) => n.to_string(),
            ParamValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Generic filter map
///
/// A BTreeMap so that iteration order (and therefore cache-key
/// fingerprints and query-string order) is stable across calls.
pub type FilterParams = BTreeMap<String, ParamValue>;

/// Error body shape returned by the proxy and backends
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<HashMap<String, FieldMessages>>,
}

/// Field-level error messages, accepted as a single string or a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldMessages {
    One(String),
    Many(Vec<String>),
}

impl FieldMessages {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            FieldMessages::One(message) => vec![message],
            FieldMessages::Many(messages) => messages,
        }
    }
}

/// Client-side error for any non-2xx response observed through the proxy
///
/// The single error currency of the data layer: thrown by the API client,
/// consumed by query-layer observers and the form-error adapter.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiClientError {
    /// HTTP status code
    pub status: u16,
    /// Human-readable message
    pub message: String,
    /// Optional field name to error messages mapping
    pub errors: Option<HashMap<String, Vec<String>>>,
}

impl ApiClientError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: None,
        }
    }

    pub fn with_errors(
        status: u16,
        message: impl Into<String>,
        errors: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            errors: Some(errors),
        }
    }

    /// Error raised when a request is cancelled cooperatively
    pub fn cancelled() -> Self {
        Self::new(499, "Request cancelled")
    }

    /// Build from a raw error body, falling back to a generic message
    pub fn from_error_body(status: u16, body: Option<ApiErrorBody>) -> Self {
        match body {
            Some(body) => {
                let message = body
                    .message
                    .unwrap_or_else(|| format!("Request failed with status {}", status));
                let errors = body.errors.map(|fields| {
                    fields
                        .into_iter()
                        .map(|(field, messages)| (field, messages.into_vec()))
                        .collect()
                });
                Self {
                    status,
                    message,
                    errors,
                }
            }
            None => Self::new(status, format!("Request failed with status {}", status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_empty_string_is_dropped() {
        assert!(ParamValue::from("").is_empty());
        assert!(!ParamValue::from("x").is_empty());
        assert!(!ParamValue::from(0i64).is_empty());
        assert!(!ParamValue::from(false).is_empty());
    }

    #[test]
    fn test_param_value_query_serialization() {
        assert_eq!(ParamValue::from("active").to_query_value(), "active");
        assert_eq!(ParamValue::from(42i64).to_query_value(), "42");
        assert_eq!(ParamValue::from(true).to_query_value(), "true");
    }

    #[test]
    fn test_error_body_single_and_multi_messages() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"message":"Validation failed","errors":{"email":["bad format"],"name":"required"}}"#,
        )
        .unwrap();

        let error = ApiClientError::from_error_body(422, Some(body));
        assert_eq!(error.status, 422);
        assert_eq!(error.message, "Validation failed");

        let errors = error.errors.unwrap();
        assert_eq!(errors["email"], vec!["bad format"]);
        assert_eq!(errors["name"], vec!["required"]);
    }

    #[test]
    fn test_error_fallback_message() {
        let error = ApiClientError::from_error_body(500, None);
        assert_eq!(error.message, "Request failed with status 500");
        assert!(error.errors.is_none());
    }

    #[test]
    fn test_envelope_deserialization() {
        let response: ApiResponse<serde_json::Value> =
            serde_json::from_str(r#"{"success":true,"data":{"theme":"dark"},"message":null}"#)
                .unwrap();
        assert!(response.success);
        assert_eq!(response.data["theme"], "dark");
        assert!(response.message.is_none());
    }
}
