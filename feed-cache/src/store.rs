use agora_core::CacheError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

pub type CacheResult<T> = Result<T, CacheError>;

/// One ordered-set mutation inside a pipelined batch.
#[derive(Debug, Clone, PartialEq)]
pub enum SortedSetOp {
    /// Insert `member` with `score`, or update the score of an existing member
    Add {
        key: String,
        member: String,
        score: f64,
    },
    Remove {
        key: String,
        member: String,
    },
    /// Keep only the `keep` highest-scored members; the lowest are evicted
    TrimToNewest { key: String, keep: usize },
    Expire { key: String, ttl: Duration },
}

/// Key/value store with per-key expiration plus a scored ordered-set structure.
///
/// Every operation is a single-key atomic operation on the backend, so no client-side locking is
/// needed when several callers touch the same key.
#[async_trait]
pub trait CacheStore: Debug + Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Returns the number of keys that were present.
    async fn delete(&self, keys: &[String]) -> CacheResult<usize>;

    /// Members ordered highest score first, skipping `offset` and returning at most `count`.
    async fn sorted_range_rev(
        &self,
        key: &str,
        offset: usize,
        count: usize,
    ) -> CacheResult<Vec<String>>;

    async fn sorted_len(&self, key: &str) -> CacheResult<usize>;

    /// Send `ops` in a single round-trip. Operations are not transactional: when some fail, the
    /// ones that succeeded stay applied and the error reports the failures.
    async fn pipeline(&self, ops: Vec<SortedSetOp>) -> CacheResult<()>;

    async fn ping(&self) -> CacheResult<()>;
}
