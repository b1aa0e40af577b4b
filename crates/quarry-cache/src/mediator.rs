//! The read-through cache mediator.

use crate::policy::{CacheContext, CachePolicy};
use crate::store::{CacheStore, CachedValue};
use asupersync::Outcome;
use quarry_core::Error;
use std::sync::Arc;

/// Mediates between callers, a [`CachePolicy`], and a [`CacheStore`].
///
/// On a miss two concurrent callers will both run their loaders; there is no
/// single-flight de-duplication. Only successful loads are stored, so errors
/// and cancellations never pin a bad entry.
#[derive(Clone)]
pub struct CacheMediator {
    policy: Arc<dyn CachePolicy>,
    store: Arc<dyn CacheStore>,
}

impl CacheMediator {
    pub fn new(policy: Arc<dyn CachePolicy>, store: Arc<dyn CacheStore>) -> Self {
        Self { policy, store }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn policy(&self) -> &Arc<dyn CachePolicy> {
        &self.policy
    }

    /// Serve `operation` through the cache.
    ///
    /// When the policy declines caching, the loader runs and its result
    /// passes through untouched. Otherwise a hit short-circuits the loader
    /// and a successful miss is stored under the policy's key and TTL.
    pub async fn get_with<F, Fut>(
        &self,
        operation: &str,
        context: &CacheContext,
        loader: F,
    ) -> Outcome<CachedValue, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome<CachedValue, Error>>,
    {
        if !self.policy.should_cache(operation, context) {
            return loader().await;
        }
        let key = self.policy.cache_key(operation, context);
        if let Some(value) = self.store.get(&key) {
            tracing::debug!(key = %key, "cache hit");
            return Outcome::Ok(value);
        }
        tracing::debug!(key = %key, "cache miss");
        match loader().await {
            Outcome::Ok(value) => {
                self.store
                    .put(&key, value.clone(), self.policy.ttl(context));
                Outcome::Ok(value)
            }
            other => other,
        }
    }

    /// Evict the single entry for `operation` + `context`.
    pub fn forget(&self, operation: &str, context: &CacheContext) {
        let key = self.policy.cache_key(operation, context);
        self.store.remove(&key);
    }

    /// Evict every entry the policy generates for `operation`.
    ///
    /// Walks the whole store; cost grows with entry count.
    pub fn forget_operation(&self, operation: &str) {
        let pattern = self.policy.operation_pattern(operation);
        let evicted = self.store.remove_matching(&pattern);
        tracing::debug!(pattern = %pattern, evicted, "bulk cache eviction");
    }

    /// Evict every entry matching an explicit glob pattern.
    pub fn forget_matching(&self, pattern: &str) {
        let evicted = self.store.remove_matching(pattern);
        tracing::debug!(pattern = %pattern, evicted, "bulk cache eviction");
    }
}

impl std::fmt::Debug for CacheMediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheMediator").finish_non_exhaustive()
    }
}
