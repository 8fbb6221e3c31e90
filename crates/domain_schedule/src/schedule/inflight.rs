use std::collections::HashMap;

use common_errors::errors::CommonError;
use domain_schedule_models::CacheKey;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use super::mediator::CachedWeek;

/// Result of one completed upstream fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub week: CachedWeek,
    /// `false` if the content is identical to the previously cached one
    pub changed: bool,
}

pub type FetchResult = Result<FetchOutcome, CommonError>;

pub type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Pending fetches by key. At most one fetch per key is registered at any time.
#[derive(Default)]
pub struct InFlightRegistry {
    fetches: Mutex<HashMap<CacheKey, SharedFetch>>,
}

impl InFlightRegistry {
    /// Join the pending fetch for `key` or register the one built by `start`.
    ///
    /// The lookup and the registration happen under one lock, so two callers can never
    /// both start a fetch for the same key. Returns `true` as the second value if the
    /// fetch was started by this call.
    pub async fn begin<F>(&self, key: &CacheKey, start: F) -> (SharedFetch, bool)
    where
        F: FnOnce() -> BoxFuture<'static, FetchResult>,
    {
        let mut fetches = self.fetches.lock().await;
        if let Some(pending) = fetches.get(key) {
            return (pending.clone(), false);
        }
        let pending = start().shared();
        fetches.insert(key.to_owned(), pending.clone());
        (pending, true)
    }

    /// Like [InFlightRegistry::begin], but never joins: returns `None` if `key` is pending.
    pub async fn begin_exclusive<F>(&self, key: &CacheKey, start: F) -> Option<SharedFetch>
    where
        F: FnOnce() -> BoxFuture<'static, FetchResult>,
    {
        let mut fetches = self.fetches.lock().await;
        if fetches.contains_key(key) {
            return None;
        }
        let pending = start().shared();
        fetches.insert(key.to_owned(), pending.clone());
        Some(pending)
    }

    /// Remove the fetch of `key`, whatever its result was.
    pub async fn end(&self, key: &CacheKey) {
        self.fetches.lock().await.remove(key);
    }

    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.fetches.lock().await.contains_key(key)
    }
}
