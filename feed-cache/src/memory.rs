use agora_core::{CacheError, Clock, SystemClock};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use crate::store::{CacheResult, CacheStore, SortedSetOp};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Sorted(HashMap<String, f64>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

/// In-process cache store.
///
/// Used for single-node deployments and tests. It can be switched offline, after which every
/// call fails with [`CacheError::Unavailable`] the way an unreachable Redis would.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
    offline: AtomicBool,
    sorted_writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            offline: AtomicBool::new(false),
            sorted_writes: AtomicU64::new(0),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Number of ordered-set operations applied through [`CacheStore::pipeline`].
    pub fn sorted_writes(&self) -> u64 {
        self.sorted_writes.load(AtomicOrdering::SeqCst)
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, HashMap<String, Entry>>> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(CacheError::Unavailable {
                reason: "memory store is offline".to_string(),
            });
        }
        self.entries.lock().map_err(|_| CacheError::Unavailable {
            reason: "memory store lock poisoned".to_string(),
        })
    }

    fn expiry(&self, ttl: Duration) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(ttl).ok()?;
        self.clock.now().checked_add_signed(ttl)
    }

    fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str, now: DateTime<Utc>) {
        let expired = entries
            .get(key)
            .and_then(|e| e.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            entries.remove(key);
        }
    }

    /// Drop `key` if it has expired and return the live entry, if any.
    fn live<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a mut Entry> {
        Self::purge_expired(entries, key, now);
        entries.get_mut(key)
    }

    fn apply(
        &self,
        entries: &mut HashMap<String, Entry>,
        op: &SortedSetOp,
        now: DateTime<Utc>,
    ) -> CacheResult<()> {
        match op {
            SortedSetOp::Add { key, member, score } => {
                Self::purge_expired(entries, key, now);
                let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
                    value: Value::Sorted(HashMap::new()),
                    expires_at: None,
                });
                sorted_mut(entry, key)?.insert(member.clone(), *score);
            }
            SortedSetOp::Remove { key, member } => {
                if let Some(entry) = Self::live(entries, key, now) {
                    let set = sorted_mut(entry, key)?;
                    set.remove(member);
                    if set.is_empty() {
                        entries.remove(key);
                    }
                }
            }
            SortedSetOp::TrimToNewest { key, keep } => {
                if let Some(entry) = Self::live(entries, key, now) {
                    let set = sorted_mut(entry, key)?;
                    if set.len() > *keep {
                        let mut ascending: Vec<(String, f64)> =
                            set.iter().map(|(m, s)| (m.clone(), *s)).collect();
                        ascending.sort_by(|a, b| by_score_then_member(a, b));
                        let evict = ascending.len() - keep;
                        for (member, _) in ascending.into_iter().take(evict) {
                            set.remove(&member);
                        }
                    }
                    if set.is_empty() {
                        entries.remove(key);
                    }
                }
            }
            SortedSetOp::Expire { key, ttl } => {
                let expires_at = self.expiry(*ttl);
                if let Some(entry) = Self::live(entries, key, now) {
                    entry.expires_at = expires_at;
                }
            }
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_mut<'a>(entry: &'a mut Entry, key: &str) -> CacheResult<&'a mut HashMap<String, f64>> {
    match &mut entry.value {
        Value::Sorted(set) => Ok(set),
        Value::Text(_) => Err(CacheError::WrongType {
            key: key.to_string(),
        }),
    }
}

// Same tie-break as Redis: equal scores order by member.
fn by_score_then_member(a: &(String, f64), b: &(String, f64)) -> Ordering {
    a.1.partial_cmp(&b.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        match Self::live(&mut entries, key, now) {
            Some(Entry {
                value: Value::Text(text),
                ..
            }) => Ok(Some(text.clone())),
            Some(_) => Err(CacheError::WrongType {
                key: key.to_string(),
            }),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let expires_at = self.expiry(ttl);
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at,
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        Ok(Self::live(&mut entries, key, now).is_some())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<usize> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        let mut removed = 0;
        for key in keys {
            if Self::live(&mut entries, key, now).is_some() {
                entries.remove(key);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn sorted_range_rev(
        &self,
        key: &str,
        offset: usize,
        count: usize,
    ) -> CacheResult<Vec<String>> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        let Some(entry) = Self::live(&mut entries, key, now) else {
            return Ok(Vec::new());
        };
        let set = sorted_mut(entry, key)?;

        let mut members: Vec<(String, f64)> = set.iter().map(|(m, s)| (m.clone(), *s)).collect();
        members.sort_by(|a, b| by_score_then_member(b, a));
        Ok(members
            .into_iter()
            .skip(offset)
            .take(count)
            .map(|(member, _)| member)
            .collect())
    }

    async fn sorted_len(&self, key: &str) -> CacheResult<usize> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        match Self::live(&mut entries, key, now) {
            Some(entry) => Ok(sorted_mut(entry, key)?.len()),
            None => Ok(0),
        }
    }

    async fn pipeline(&self, ops: Vec<SortedSetOp>) -> CacheResult<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let now = self.clock.now();
        let mut entries = self.lock()?;
        let mut failures = Vec::new();
        for op in &ops {
            match self.apply(&mut entries, op, now) {
                Ok(()) => {
                    self.sorted_writes.fetch_add(1, AtomicOrdering::SeqCst);
                }
                Err(e) => failures.push(e.to_string()),
            }
        }

        debug!(
            "Applied pipeline of {} operations ({} failed)",
            ops.len(),
            failures.len()
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CacheError::PipelineFailed {
                operations: failures.len(),
                reason: failures.join("; "),
            })
        }
    }

    async fn ping(&self) -> CacheResult<()> {
        self.lock().map(|_| ())
    }
}
