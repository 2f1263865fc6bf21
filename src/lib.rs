//! BFF Proxy Library
//!
//! Provides the backend-for-frontend proxy server plus the client-side
//! data access layer: provider registry, typed API client, caching query
//! layer and form-error adapter

pub mod api;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod providers;
pub mod query;
pub mod utils;

// Re-export common types
pub use api::client::ApiClient;
pub use api::types::{ApiClientError, ApiListResponse, ApiResponse};
pub use config::Settings;
pub use handlers::{create_router, AppState};
pub use providers::{get_provider, has_provider, provider_names, DataProvider, DEFAULT_PROVIDER};
pub use query::{ListOptions, MutationOptions, OneOptions, QueryClient};
pub use utils::error::{AppError, AppResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
