use agora_core::{CacheError, CoreError};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::metrics::CacheMetrics;
use crate::store::CacheStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmupResult {
    Written,
    /// The key was already cached and the warmup was not forced
    AlreadyPresent,
    /// The cache could not be reached; nothing was written
    Failed,
}

/// Get-or-load wrapper over a [`CacheStore`].
///
/// Cache failures are logged and treated as a miss on read and as a no-op on write. Values are
/// derived data, so concurrent writers of the same key simply race and the last write wins.
#[derive(Debug, Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    metrics: Arc<CacheMetrics>,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_metrics(store, Arc::new(CacheMetrics::new()))
    }

    pub fn with_metrics(store: Arc<dyn CacheStore>, metrics: Arc<CacheMetrics>) -> Self {
        Self { store, metrics }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    /// Return the cached value for `key`, or run `loader` and cache what it returns for `ttl`.
    ///
    /// Errors from `loader` are returned unchanged and nothing is cached for them.
    pub async fn get_or_load<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> Result<T, CoreError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, CoreError>> + Send,
    {
        if let Some(value) = self.read(key).await {
            return Ok(value);
        }

        let value = loader().await?;
        self.write(key, &value, ttl).await;
        Ok(value)
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.invalidate_multiple(&[key.to_string()]).await
    }

    /// Returns false if the cache could not be reached.
    pub async fn invalidate_multiple(&self, keys: &[String]) -> bool {
        if keys.is_empty() {
            return true;
        }

        match self.store.delete(keys).await {
            Ok(removed) => {
                debug!("Invalidated {} of {} cache keys", removed, keys.len());
                self.metrics.record_invalidation(removed as u64);
                true
            }
            Err(e) => {
                warn!("Cache invalidation failed for {} keys: {}", keys.len(), e);
                self.metrics.record_error();
                false
            }
        }
    }

    /// Write-through of a value the caller already holds. Existing keys are left alone unless
    /// `force` is set.
    pub async fn warmup<T>(&self, key: &str, value: &T, ttl: Duration, force: bool) -> WarmupResult
    where
        T: Serialize + Sync,
    {
        if !force {
            match self.store.exists(key).await {
                Ok(true) => return WarmupResult::AlreadyPresent,
                Ok(false) => {}
                Err(e) => {
                    warn!("Cache warmup existence check failed for {}: {}", key, e);
                    self.metrics.record_error();
                    return WarmupResult::Failed;
                }
            }
        }

        if self.write(key, value, ttl).await {
            WarmupResult::Written
        } else {
            WarmupResult::Failed
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match decode::<T>(key, &raw) {
                Ok(value) => {
                    debug!("Cache hit for {}", key);
                    self.metrics.record_hit();
                    Some(value)
                }
                Err(e) => {
                    warn!("{}, loading from source", e);
                    self.metrics.record_error();
                    None
                }
            },
            Ok(None) => {
                debug!("Cache miss for {}", key);
                self.metrics.record_miss();
                None
            }
            Err(e) => {
                warn!("Cache read failed for {}, loading from source: {}", key, e);
                self.metrics.record_error();
                None
            }
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Value for {} could not be encoded for caching: {}", key, e);
                self.metrics.record_error();
                return false;
            }
        };

        match self.store.set(key, &encoded, ttl).await {
            Ok(()) => {
                self.metrics.record_write();
                true
            }
            Err(e) => {
                warn!("Cache write failed for {}: {}", key, e);
                self.metrics.record_error();
                false
            }
        }
    }
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, CacheError> {
    serde_json::from_str(raw).map_err(|e| CacheError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
