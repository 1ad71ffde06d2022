use agora_core::CacheError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::store::{CacheResult, CacheStore, SortedSetOp};

/// Redis-backed cache store.
///
/// [`ConnectionManager`] is a cheaply clonable multiplexed handle that reconnects on its own, so
/// each call clones it instead of serialising callers behind a lock.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    url: String,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("url", &self.url)
            .finish()
    }
}

impl RedisStore {
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis at {}", url);
        Ok(Self {
            conn,
            url: url.to_string(),
        })
    }
}

/// `ttl` plus up to 10%, so keys written together do not expire together.
fn jittered_ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs().max(1);
    secs + fastrand::u64(0..=secs / 10)
}

/// Lowest rank to delete so that only the `keep` highest-scored members survive.
fn trim_stop_rank(keep: usize) -> i64 {
    -(keep as i64) - 1
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(jittered_ttl_secs(ttl))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let count = redis::cmd("EXISTS")
            .arg(key)
            .query_async::<_, usize>(&mut conn)
            .await?;
        Ok(count > 0)
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(key.as_str());
        }
        let mut conn = self.conn.clone();
        let removed = cmd.query_async::<_, usize>(&mut conn).await?;
        Ok(removed)
    }

    async fn sorted_range_rev(
        &self,
        key: &str,
        offset: usize,
        count: usize,
    ) -> CacheResult<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let members = redis::cmd("ZREVRANGE")
            .arg(key)
            .arg(offset)
            .arg(offset + count - 1)
            .query_async::<_, Vec<String>>(&mut conn)
            .await?;
        Ok(members)
    }

    async fn sorted_len(&self, key: &str) -> CacheResult<usize> {
        let mut conn = self.conn.clone();
        let len = redis::cmd("ZCARD")
            .arg(key)
            .query_async::<_, usize>(&mut conn)
            .await?;
        Ok(len)
    }

    /// The reply to a pipeline fails as a whole on the first error, so a failure reports every
    /// queued operation even though Redis kept the ones that succeeded.
    async fn pipeline(&self, ops: Vec<SortedSetOp>) -> CacheResult<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for op in &ops {
            match op {
                SortedSetOp::Add { key, member, score } => {
                    pipe.cmd("ZADD").arg(key).arg(*score).arg(member).ignore();
                }
                SortedSetOp::Remove { key, member } => {
                    pipe.cmd("ZREM").arg(key).arg(member).ignore();
                }
                SortedSetOp::TrimToNewest { key, keep } => {
                    pipe.cmd("ZREMRANGEBYRANK")
                        .arg(key)
                        .arg(0)
                        .arg(trim_stop_rank(*keep))
                        .ignore();
                }
                SortedSetOp::Expire { key, ttl } => {
                    pipe.cmd("EXPIRE")
                        .arg(key)
                        .arg(ttl.as_secs().max(1))
                        .ignore();
                }
            }
        }

        let mut conn = self.conn.clone();
        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| CacheError::PipelineFailed {
                operations: ops.len(),
                reason: e.to_string(),
            })?;

        debug!("Redis pipeline applied {} operations", ops.len());
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_stop_rank_keeps_top_members() {
        // ZREMRANGEBYRANK key 0 -4 leaves the three highest-ranked members
        assert_eq!(trim_stop_rank(3), -4);
        assert_eq!(trim_stop_rank(500), -501);
    }

    #[test]
    fn test_ttl_jitter_stays_within_ten_percent() {
        for _ in 0..100 {
            let secs = jittered_ttl_secs(Duration::from_secs(3600));
            assert!((3600..=3960).contains(&secs));
        }
        assert_eq!(jittered_ttl_secs(Duration::from_millis(10)), 1);
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let result = RedisStore::connect("not-a-redis-url").await;
        assert!(matches!(result, Err(CacheError::Redis(_))));
    }
}
