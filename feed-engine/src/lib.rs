//! Feed distribution: fan-out on publish for ordinary authors, fan-in at read time for everyone
//! else, and cache-backed feed reads.

pub mod service;

pub use service::{FeedService, PushOutcome, PUSH_BATCH_SIZE};
