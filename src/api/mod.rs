//! Client-side API module
//!
//! The typed HTTP client that talks to the BFF proxy, the normalized
//! response envelopes, and the form-error adapter

pub mod client;
pub mod form_errors;
pub mod types;

pub use client::{ApiClient, RequestOptions};
pub use types::{
    ApiClientError, ApiListResponse, ApiResponse, FilterParams, PaginationMeta, PaginationParams,
    ParamValue, SortOrder, SortParams,
};
