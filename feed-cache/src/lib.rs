//! Cache layer for the feed subsystem.
//!
//! A [`CacheStore`] is the raw key/value + ordered-set backend (in-process or Redis). The
//! [`CacheAside`] wrapper sits on top of it and never lets a cache failure become a caller
//! failure: reads degrade to the loader, writes degrade to no-ops.

pub mod aside;
pub mod keys;
pub mod memory;
pub mod metrics;
pub mod redis_store;
pub mod store;

pub use aside::{CacheAside, WarmupResult};
pub use memory::MemoryStore;
pub use metrics::{CacheMetrics, CacheMetricsSnapshot};
pub use redis_store::RedisStore;
pub use store::{CacheResult, CacheStore, SortedSetOp};
