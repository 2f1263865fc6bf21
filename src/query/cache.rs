//! Key-addressed query cache
//!
//! Shared by every read primitive of one QueryClient. Entries are keyed by
//! a deterministic QueryKey so that readers and invalidators always address
//! the same slot; concurrent reads of the same key are coalesced into a
//! single in-flight fetch.

use crate::api::types::{ApiClientError, FilterParams, PaginationParams, SortParams};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Deterministic cache key: `[provider, resource, kind, fingerprint?]`
///
/// Byte-identical for equal inputs, different whenever any component
/// differs. Keys for different providers or resources can never collide
/// because both are distinct leading segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

/// Structural fingerprint of list parameters
///
/// Omitted pagination/filters/sort normalize to their empty defaults, so an
/// omitted argument and an explicit empty one share a slot - they request
/// identical wire queries.
#[derive(Serialize)]
struct ListFingerprint<'a> {
    pagination: &'a PaginationParams,
    filters: &'a FilterParams,
    sort: &'a Option<SortParams>,
}

impl QueryKey {
    /// Key for a list read
    pub fn list(
        provider: &str,
        resource: &str,
        pagination: &Option<PaginationParams>,
        filters: &Option<FilterParams>,
        sort: &Option<SortParams>,
    ) -> Self {
        let default_pagination = PaginationParams::default();
        let default_filters = FilterParams::default();

        let fingerprint = ListFingerprint {
            pagination: pagination.as_ref().unwrap_or(&default_pagination),
            filters: filters.as_ref().unwrap_or(&default_filters),
            sort,
        };

        // Plain data over BTreeMap-backed filters; serialization is
        // infallible and order-stable.
        let fingerprint = serde_json::to_string(&fingerprint)
            .expect("list fingerprint serialization is infallible");

        Self(vec![
            provider.to_string(),
            resource.to_string(),
            "list".to_string(),
            fingerprint,
        ])
    }

    /// Key for a single read
    pub fn one(provider: &str, resource: &str) -> Self {
        Self(vec![
            provider.to_string(),
            resource.to_string(),
            "one".to_string(),
        ])
    }

    /// Prefix addressing every cached read of one resource under one provider
    pub fn prefix(provider: &str, resource: &str) -> Self {
        Self(vec![provider.to_string(), resource.to_string()])
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Fresh,
    Stale,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    state: EntryState,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<QueryKey, CacheEntry>,
    // One watch channel per in-flight fetch; waiters observe completion
    // through it without racing the leader's wakeup.
    in_flight: HashMap<QueryKey, watch::Receiver<bool>>,
}

/// Shared, key-addressed cache with request coalescing
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for a key without fetching
    pub fn peek(&self, key: &QueryKey) -> Option<Value> {
        let inner = self.inner.lock().expect("query cache lock poisoned");
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Whether a fresh entry exists for the key
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        let inner = self.inner.lock().expect("query cache lock poisoned");
        inner
            .entries
            .get(key)
            .map(|entry| entry.state == EntryState::Fresh)
            .unwrap_or(false)
    }

    /// Mark every entry under the prefix stale; the next read refetches
    ///
    /// Returns the number of entries touched.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let mut inner = self.inner.lock().expect("query cache lock poisoned");
        let mut touched = 0;
        for (key, entry) in inner.entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.state = EntryState::Stale;
                touched += 1;
            }
        }
        debug!("Invalidated {} cache entries under {:?}", touched, prefix);
        touched
    }

    /// Get the fresh cached value for a key, or fetch it
    ///
    /// Concurrent callers for the same key share one in-flight fetch: the
    /// first becomes the leader, the rest wait on its completion and then
    /// re-read the cache. A cancelled fetch never writes the cache.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &QueryKey,
        fetch: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, ApiClientError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Value, ApiClientError>>,
    {
        enum Role {
            Waiter(watch::Receiver<bool>),
            Leader(watch::Sender<bool>),
        }

        loop {
            // The guard must be released before any await below, or the
            // returned future stops being Send.
            let role = {
                let mut inner = self.inner.lock().expect("query cache lock poisoned");

                if let Some(entry) = inner.entries.get(key) {
                    if entry.state == EntryState::Fresh {
                        return Ok(entry.value.clone());
                    }
                }

                match inner.in_flight.get(key) {
                    Some(receiver) => Role::Waiter(receiver.clone()),
                    None => {
                        let (sender, receiver) = watch::channel(false);
                        inner.in_flight.insert(key.clone(), receiver);
                        Role::Leader(sender)
                    }
                }
            };

            match role {
                Role::Leader(sender) => {
                    return self.lead_fetch(key, fetch, cancel, sender).await;
                }
                Role::Waiter(mut receiver) => {
                    // The watch channel retains its last value, so a completion
                    // signalled before we subscribe is still observed. A dropped
                    // sender (leader failed or was cancelled) sends us back to
                    // the top of the loop to take over.
                    while !*receiver.borrow() {
                        if receiver.changed().await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn lead_fetch<F, Fut>(
        &self,
        key: &QueryKey,
        fetch: F,
        cancel: Option<&CancellationToken>,
        sender: watch::Sender<bool>,
    ) -> Result<Value, ApiClientError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Value, ApiClientError>>,
    {
        let result = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(ApiClientError::cancelled()),
                result = fetch() => result,
            },
            None => fetch().await,
        };

        let cancelled = cancel.map(|token| token.is_cancelled()).unwrap_or(false);

        let mut inner = self.inner.lock().expect("query cache lock poisoned");
        inner.in_flight.remove(key);

        match &result {
            Ok(value) if !cancelled => {
                inner.entries.insert(
                    key.clone(),
                    CacheEntry {
                        value: value.clone(),
                        state: EntryState::Fresh,
                    },
                );
                let _ = sender.send(true);
            }
            _ => {
                // Cancelled or failed: no cache write; dropping the sender
                // wakes waiters so one of them can take over.
                drop(sender);
            }
        }

        if cancelled {
            return Err(ApiClientError::cancelled());
        }

        result
    }

    #[cfg(test)]
    pub fn entry_count(&self) -> usize {
        self.inner
            .lock()
            .expect("query cache lock poisoned")
            .entries
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{ParamValue, SortOrder};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_key_determinism() {
        let pagination = Some(PaginationParams {
            page: Some(2),
            page_size: Some(10),
        });
        let mut filters = FilterParams::new();
        filters.insert("status".to_string(), ParamValue::from("active"));
        let filters = Some(filters);
        let sort = Some(SortParams {
            field: "created_at".to_string(),
            order: SortOrder::Desc,
        });

        let a = QueryKey::list("core", "contributors", &pagination, &filters, &sort);
        let b = QueryKey::list("core", "contributors", &pagination, &filters, &sort);
        assert_eq!(a, b);

        let different_page = Some(PaginationParams {
            page: Some(3),
            page_size: Some(10),
        });
        let c = QueryKey::list("core", "contributors", &different_page, &filters, &sort);
        assert_ne!(a, c);
    }

    #[test]
    fn test_omitted_and_empty_params_collide() {
        let omitted = QueryKey::list("core", "contributors", &None, &None, &None);
        let explicit = QueryKey::list(
            "core",
            "contributors",
            &Some(PaginationParams::default()),
            &Some(FilterParams::new()),
            &None,
        );
        assert_eq!(omitted, explicit);
    }

    #[test]
    fn test_provider_isolation() {
        let core = QueryKey::list("core", "contributors", &None, &None, &None);
        let other = QueryKey::list("other", "contributors", &None, &None, &None);
        assert_ne!(core, other);
        assert!(!core.starts_with(&QueryKey::prefix("other", "contributors")));
    }

    #[test]
    fn test_prefix_matching() {
        let key = QueryKey::list("core", "contributors/register", &None, &None, &None);
        assert!(key.starts_with(&QueryKey::prefix("core", "contributors/register")));
        assert!(!key.starts_with(&QueryKey::prefix("core", "contributors")));
    }

    #[tokio::test]
    async fn test_fetch_caches_and_serves_fresh() {
        let cache = QueryCache::new();
        let key = QueryKey::one("core", "settings");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(
                    &key,
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(json!({"theme": "dark"}))
                    },
                    None,
                )
                .await
                .unwrap();
            assert_eq!(value["theme"], "dark");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidation_triggers_refetch() {
        let cache = QueryCache::new();
        let key = QueryKey::list("core", "contributors", &None, &None, &None);
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"data": []}))
        };

        cache.get_or_fetch(&key, fetch, None).await.unwrap();
        cache.invalidate_prefix(&QueryKey::prefix("core", "contributors"));
        assert!(!cache.is_fresh(&key));
        cache.get_or_fetch(&key, fetch, None).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidation_only_touches_prefix() {
        let cache = QueryCache::new();
        let register = QueryKey::list("core", "contributors/register", &None, &None, &None);
        let settings = QueryKey::one("core", "settings");

        cache
            .get_or_fetch(&register, || async { Ok(json!(1)) }, None)
            .await
            .unwrap();
        cache
            .get_or_fetch(&settings, || async { Ok(json!(2)) }, None)
            .await
            .unwrap();

        let touched = cache.invalidate_prefix(&QueryKey::prefix("core", "contributors/register"));
        assert_eq!(touched, 1);
        assert!(!cache.is_fresh(&register));
        assert!(cache.is_fresh(&settings));
    }

    #[tokio::test]
    async fn test_concurrent_reads_coalesce() {
        let cache = QueryCache::new();
        let key = QueryKey::one("core", "settings");
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let key = key.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(
                        &key,
                        || {
                            let calls = calls.clone();
                            async move {
                                calls.fetch_add(1, Ordering::SeqCst);
                                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                                Ok(json!({"ok": true}))
                            }
                        },
                        None,
                    )
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            let value = handle.await.unwrap();
            assert_eq!(value["ok"], true);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_does_not_write_cache() {
        let cache = QueryCache::new();
        let key = QueryKey::one("core", "settings");
        let token = CancellationToken::new();
        token.cancel();

        let result = cache
            .get_or_fetch(&key, || async { Ok(json!({"theme": "dark"})) }, Some(&token))
            .await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().status, 499);
        assert_eq!(cache.entry_count(), 0);
    }
}
