//! Core service provider
//!
//! - Page-based pagination (`page`, `page_size`)
//! - Standard `{success, data, meta, message}` response format

use crate::api::types::{
    ApiListResponse, ApiResponse, PaginationMeta, PaginationParams, SortParams,
};
use crate::providers::{DataProvider, PaginationType, ProviderError};
use serde::Deserialize;
use serde_json::Value;

/// Raw list response shape of the core service
#[derive(Debug, Deserialize)]
struct CoreListResponse {
    success: bool,
    data: Vec<Value>,
    meta: CoreMeta,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoreMeta {
    total: u64,
}

/// Raw single-item response shape of the core service
#[derive(Debug, Deserialize)]
struct CoreOneResponse {
    success: bool,
    data: Value,
    #[serde(default)]
    message: Option<String>,
}

/// Core service provider configuration
#[derive(Debug)]
pub struct CoreProvider;

impl CoreProvider {
    pub const NAME: &'static str = "core";

    fn malformed(source: serde_json::Error) -> ProviderError {
        ProviderError::MalformedResponse {
            provider: Self::NAME.to_string(),
            source,
        }
    }
}

impl DataProvider for CoreProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn pagination(&self) -> PaginationType {
        PaginationType::PageBased
    }

    fn transform_pagination(&self, params: &PaginationParams) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), params.page.unwrap_or(1).to_string()),
            (
                "page_size".to_string(),
                params.page_size.unwrap_or(10).to_string(),
            ),
        ]
    }

    fn transform_sort(&self, sort: &SortParams) -> Vec<(String, String)> {
        vec![
            ("sort_by".to_string(), sort.field.clone()),
            ("sort_order".to_string(), sort.order.as_str().to_string()),
        ]
    }

    fn transform_list_response(&self, raw: Value) -> Result<ApiListResponse<Value>, ProviderError> {
        let raw: CoreListResponse = serde_json::from_value(raw).map_err(Self::malformed)?;

        Ok(ApiListResponse {
            success: raw.success,
            data: raw.data,
            meta: PaginationMeta {
                total: raw.meta.total,
            },
            message: raw.message,
        })
    }

    fn transform_one_response(&self, raw: Value) -> Result<ApiResponse<Value>, ProviderError> {
        let raw: CoreOneResponse = serde_json::from_value(raw).map_err(Self::malformed)?;

        Ok(ApiResponse {
            success: raw.success,
            data: raw.data,
            message: raw.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pagination_defaults() {
        let params = CoreProvider.transform_pagination(&PaginationParams::default());
        assert_eq!(
            params,
            vec![
                ("page".to_string(), "1".to_string()),
                ("page_size".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_pagination_explicit_values() {
        let params = CoreProvider.transform_pagination(&PaginationParams {
            page: Some(2),
            page_size: Some(10),
        });
        assert_eq!(
            params,
            vec![
                ("page".to_string(), "2".to_string()),
                ("page_size".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_sort_transform() {
        use crate::api::types::SortOrder;

        let params = CoreProvider.transform_sort(&SortParams {
            field: "created_at".to_string(),
            order: SortOrder::Desc,
        });
        assert_eq!(
            params,
            vec![
                ("sort_by".to_string(), "created_at".to_string()),
                ("sort_order".to_string(), "desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_response_transform() {
        let raw = json!({
            "success": true,
            "data": [{"id": 1}, {"id": 2}, {"id": 3}],
            "meta": {"total": 37},
            "message": null
        });

        let response = CoreProvider.transform_list_response(raw).unwrap();
        assert!(response.success);
        assert_eq!(response.data.len(), 3);
        assert_eq!(response.meta.total, 37);
        assert!(response.message.is_none());
    }

    #[test]
    fn test_one_response_transform() {
        let raw = json!({
            "success": true,
            "data": {"theme": "dark"},
            "message": null
        });

        let response = CoreProvider.transform_one_response(raw).unwrap();
        assert!(response.success);
        assert_eq!(response.data["theme"], "dark");
    }

    #[test]
    fn test_malformed_list_response() {
        let raw = json!({"unexpected": "shape"});

        let error = CoreProvider.transform_list_response(raw).unwrap_err();
        assert!(error.to_string().contains("core"));
    }
}
