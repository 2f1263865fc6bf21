//! Generic query layer
//!
//! Resource-agnostic read/write primitives over the API client and the
//! provider registry: cached list reads, cached single reads and
//! cache-invalidating mutations. Knows nothing about concrete resources,
//! only about providers and resource paths.

pub mod cache;
pub mod list;
pub mod mutation;
pub mod one;

use crate::api::client::ApiClient;
use cache::{QueryCache, QueryKey};

pub use list::{ListOptions, ListResult};
pub use mutation::{Mutation, MutationMethod, MutationOptions, MutationState};
pub use one::OneOptions;

/// Facade over the cache and the API client
///
/// Cheap to clone; clones share one cache, so a mutation through one clone
/// invalidates reads made through another.
#[derive(Clone)]
pub struct QueryClient {
    pub(crate) api: ApiClient,
    pub(crate) cache: QueryCache,
}

impl QueryClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            cache: QueryCache::new(),
        }
    }

    /// Create a mutation bound to this client
    pub fn mutation(&self, options: MutationOptions) -> Mutation {
        Mutation::new(self.clone(), options)
    }

    /// Mark every cached read under the key prefix stale
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        self.cache.invalidate_prefix(prefix)
    }
}
