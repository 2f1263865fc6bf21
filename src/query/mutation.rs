//! Mutations
//!
//! Write primitive for resources: exactly one HTTP call per invocation,
//! never coalesced, followed by cache invalidation of the corresponding
//! reads so a write is never followed by a stale read.

use crate::api::client::RequestOptions;
use crate::api::types::{ApiClientError, ApiResponse};
use crate::providers::{get_provider, DEFAULT_PROVIDER};
use crate::query::cache::QueryKey;
use crate::query::QueryClient;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// HTTP methods a mutation may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationMethod {
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl MutationMethod {
    fn as_http(&self) -> Method {
        match self {
            MutationMethod::Post => Method::POST,
            MutationMethod::Put => Method::PUT,
            MutationMethod::Patch => Method::PATCH,
            MutationMethod::Delete => Method::DELETE,
        }
    }

    /// Whether this method carries a request body
    fn has_body(&self) -> bool {
        !matches!(self, MutationMethod::Delete)
    }
}

/// Per-invocation state machine, re-enterable across calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationState {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

type SuccessObserver = Box<dyn Fn(&Value) + Send + Sync>;
type ErrorObserver = Box<dyn Fn(&ApiClientError) + Send + Sync>;
type SettledObserver = Box<dyn Fn(Option<&Value>, Option<&ApiClientError>) + Send + Sync>;

/// Options for a mutation
#[derive(Debug, Clone)]
pub struct MutationOptions {
    /// Resource name (e.g. "contributors/register")
    pub resource: String,
    /// Resource id, appended as `resource/id` when present
    pub id: Option<String>,
    /// Data provider to use (defaults to "core")
    pub data_provider: Option<String>,
    /// HTTP method (default POST)
    pub method: MutationMethod,
    /// Cache key groups to invalidate on success; defaults to every cached
    /// read under `[provider, resource]`
    pub invalidate_keys: Option<Vec<QueryKey>>,
    /// Cooperative cancellation signal
    pub cancel: Option<CancellationToken>,
}

impl MutationOptions {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id: None,
            data_provider: None,
            method: MutationMethod::Post,
            invalidate_keys: None,
            cancel: None,
        }
    }
}

/// A mutation bound to a QueryClient
///
/// Holds the `Idle -> Pending -> (Success | Error)` state machine and the
/// optional success/error/settled observers.
pub struct Mutation {
    client: QueryClient,
    options: MutationOptions,
    state: Arc<Mutex<MutationState>>,
    on_success: Option<SuccessObserver>,
    on_error: Option<ErrorObserver>,
    on_settled: Option<SettledObserver>,
}

impl Mutation {
    pub(crate) fn new(client: QueryClient, options: MutationOptions) -> Self {
        Self {
            client,
            options,
            state: Arc::new(Mutex::new(MutationState::Idle)),
            on_success: None,
            on_error: None,
            on_settled: None,
        }
    }

    /// Observer invoked with the unwrapped payload on success
    pub fn on_success(mut self, observer: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(observer));
        self
    }

    /// Observer invoked with the typed error on failure
    pub fn on_error(
        mut self,
        observer: impl Fn(&ApiClientError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(observer));
        self
    }

    /// Observer invoked after success or failure
    pub fn on_settled(
        mut self,
        observer: impl Fn(Option<&Value>, Option<&ApiClientError>) + Send + Sync + 'static,
    ) -> Self {
        self.on_settled = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> MutationState {
        *self.state.lock().expect("mutation state lock poisoned")
    }

    /// Return to Idle so the mutation can be invoked again
    pub fn reset(&self) {
        *self.state.lock().expect("mutation state lock poisoned") = MutationState::Idle;
    }

    fn set_state(&self, state: MutationState) {
        *self.state.lock().expect("mutation state lock poisoned") = state;
    }

    fn endpoint(&self) -> String {
        match &self.options.id {
            Some(id) => format!("{}/{}", self.options.resource, id),
            None => self.options.resource.clone(),
        }
    }

    /// Execute the mutation with the given body
    ///
    /// Issues exactly one HTTP call, applies the provider's one-response
    /// transform, invalidates the related list cache on success and returns
    /// the unwrapped payload. The typed conversion is part of the outcome:
    /// a payload the caller's type rejects lands in the Error state, never
    /// Success. A cancelled call updates neither the cache nor the
    /// observers.
    pub async fn mutate<T: DeserializeOwned, B: Serialize>(
        &self,
        body: &B,
    ) -> Result<T, ApiClientError> {
        self.set_state(MutationState::Pending);

        let result = self.run(body).await.and_then(|payload| {
            let typed: T = serde_json::from_value(payload.clone()).map_err(|e| {
                ApiClientError::new(500, format!("Invalid response payload: {}", e))
            })?;
            Ok((payload, typed))
        });

        match result {
            Ok((payload, typed)) => {
                self.set_state(MutationState::Success);
                self.invalidate();
                if let Some(observer) = &self.on_success {
                    observer(&payload);
                }
                if let Some(observer) = &self.on_settled {
                    observer(Some(&payload), None);
                }
                Ok(typed)
            }
            Err(error) if error.status == 499 => {
                // Cancelled: no invalidation, no observers
                self.set_state(MutationState::Idle);
                Err(error)
            }
            Err(error) => {
                self.set_state(MutationState::Error);
                if let Some(observer) = &self.on_error {
                    observer(&error);
                }
                if let Some(observer) = &self.on_settled {
                    observer(None, Some(&error));
                }
                Err(error)
            }
        }
    }

    async fn run<B: Serialize>(&self, body: &B) -> Result<Value, ApiClientError> {
        let provider_name = self
            .options
            .data_provider
            .as_deref()
            .unwrap_or(DEFAULT_PROVIDER);
        let provider = get_provider(provider_name)?;

        let request_body = if self.options.method.has_body() {
            Some(serde_json::to_value(body).map_err(|e| {
                ApiClientError::new(0, format!("Invalid request body: {}", e))
            })?)
        } else {
            None
        };

        let request = RequestOptions {
            method: Some(self.options.method.as_http()),
            body: request_body,
            provider: Some(provider_name.to_string()),
            cancel: self.options.cancel.clone(),
        };

        let raw = self.api().raw(&self.endpoint(), request, &[]).await?;

        // A 204 arrives as Null; there is no envelope to transform
        if raw.is_null() {
            return Ok(Value::Null);
        }

        let normalized: ApiResponse<Value> = provider.transform_one_response(raw)?;
        Ok(normalized.data)
    }

    fn invalidate(&self) {
        let provider_name = self
            .options
            .data_provider
            .as_deref()
            .unwrap_or(DEFAULT_PROVIDER);

        match &self.options.invalidate_keys {
            Some(keys) => {
                for key in keys {
                    self.client.invalidate(key);
                }
            }
            None => {
                let prefix = QueryKey::prefix(provider_name, &self.options.resource);
                debug!("Invalidating cached reads under {:?}", prefix);
                self.client.invalidate(&prefix);
            }
        }
    }

    fn api(&self) -> &crate::api::client::ApiClient {
        &self.client.api
    }
}
