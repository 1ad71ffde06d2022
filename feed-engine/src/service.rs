use agora_core::{
    CacheError, CircleId, CoreError, FeedConfig, FeedSort, FollowGraph, Page, Post, PostFilter,
    PostId, PostRepository, UserId, UserProfiles,
};
use feed_cache::keys::{feed_key, feed_member, parse_feed_member, post_key};
use feed_cache::{CacheAside, SortedSetOp};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Followers per pipelined round-trip. Three operations are queued per follower.
pub const PUSH_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PushOutcome {
    /// The author has more followers than the fan-out threshold; readers will pull the post
    Skipped { follower_count: i64 },
    Pushed {
        followers: usize,
        /// Cache operations reported as failed. Fan-out is best-effort, so these are only logged.
        /// Exact for stores that report per-operation results; for Redis it is every operation
        /// in a batch whose reply was an error, some of which may have applied.
        failed_operations: usize,
    },
}

/// Hybrid push/pull feed distribution.
///
/// Feed sets in the cache are a disposable recency index. Anything they cannot answer is served
/// from the durable store, and post payloads always go through the cache-aside layer.
#[derive(Debug, Clone)]
pub struct FeedService {
    posts: Arc<dyn PostRepository>,
    follows: Arc<dyn FollowGraph>,
    profiles: Arc<dyn UserProfiles>,
    cache: CacheAside,
    config: FeedConfig,
    post_ttl: Duration,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        follows: Arc<dyn FollowGraph>,
        profiles: Arc<dyn UserProfiles>,
        cache: CacheAside,
        config: FeedConfig,
        post_ttl: Duration,
    ) -> Self {
        Self {
            posts,
            follows,
            profiles,
            cache,
            config,
            post_ttl,
        }
    }

    /// Fan a freshly published post out to its author's followers.
    ///
    /// Authors above the fan-out threshold get no writes at all. Cache failures are counted in
    /// the outcome; only durable-store failures and a missing post are errors.
    pub async fn push_to_follower_feeds(
        &self,
        post_id: PostId,
        author_id: UserId,
    ) -> Result<PushOutcome, CoreError> {
        let follower_count = self.profiles.follower_count_of(author_id).await?;
        if follower_count > self.config.fanout_threshold {
            info!(
                "Author {} has {} followers (threshold {}), post {} will be served by pull",
                author_id, follower_count, self.config.fanout_threshold, post_id
            );
            return Ok(PushOutcome::Skipped { follower_count });
        }

        let post = self
            .posts
            .find_post_by_id(post_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("post {}", post_id)))?;

        let followers = self.follows.follower_ids_of(author_id).await?;
        if followers.is_empty() {
            debug!("Author {} has no followers, nothing to push", author_id);
            return Ok(PushOutcome::Pushed {
                followers: 0,
                failed_operations: 0,
            });
        }

        let member = feed_member(post_id);
        let score = recency_score(&post);
        let mut failed_operations = 0;

        for batch in followers.chunks(PUSH_BATCH_SIZE) {
            let mut ops = Vec::with_capacity(batch.len() * 3);
            for follower_id in batch {
                let key = feed_key(*follower_id);
                ops.push(SortedSetOp::Add {
                    key: key.clone(),
                    member: member.clone(),
                    score,
                });
                ops.push(SortedSetOp::TrimToNewest {
                    key: key.clone(),
                    keep: self.config.max_feed_size,
                });
                ops.push(SortedSetOp::Expire {
                    key,
                    ttl: self.config.feed_ttl(),
                });
            }

            let queued = ops.len();
            if let Err(e) = self.cache.store().pipeline(ops).await {
                let failed = match &e {
                    CacheError::PipelineFailed { operations, .. } => *operations,
                    _ => queued,
                };
                warn!(
                    "Fan-out of post {} partially failed ({} of {} operations): {}",
                    post_id, failed, queued, e
                );
                self.cache.metrics().record_error();
                failed_operations += failed;
            }
        }

        info!(
            "Pushed post {} to {} follower feeds of author {}",
            post_id,
            followers.len(),
            author_id
        );
        Ok(PushOutcome::Pushed {
            followers: followers.len(),
            failed_operations,
        })
    }

    /// One page of a user's home feed.
    ///
    /// `Latest` reads the cached feed set and falls back to the durable store when it is
    /// unreadable or empty. `Hot` always reads the durable store. A page never mixes the two.
    pub async fn get_user_feed(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
        sort: FeedSort,
    ) -> Result<Vec<Post>, CoreError> {
        let page = Page::new(limit, offset);

        if sort == FeedSort::Latest {
            if let Some(ids) = self.cached_feed_ids(user_id, page).await {
                debug!("Serving feed of user {} from cache ({} ids)", user_id, ids.len());
                return self.load_posts(ids).await;
            }
        }

        self.pull_user_feed(user_id, sort, page).await
    }

    pub async fn get_circle_feed(
        &self,
        circle_id: CircleId,
        limit: u32,
        offset: u32,
        sort: FeedSort,
    ) -> Result<Vec<Post>, CoreError> {
        let filter = PostFilter::published().in_circle(circle_id);
        self.posts
            .list_posts(&filter, sort, Page::new(limit, offset))
            .await
    }

    /// Best-effort removal of a deleted post. Returns the number of feed sets it was removed from.
    ///
    /// The cached payload is always invalidated. Feed entries that cannot be removed are left to
    /// expire; the read path skips them.
    pub async fn remove_from_feeds(&self, post_id: PostId) -> Result<usize, CoreError> {
        self.cache.invalidate(&post_key(post_id)).await;

        let Some(post) = self.posts.find_post_by_id(post_id).await? else {
            debug!("Post {} not found, only its payload was invalidated", post_id);
            return Ok(0);
        };

        let followers = self.follows.follower_ids_of(post.author_id).await?;
        if followers.is_empty() {
            return Ok(0);
        }

        let member = feed_member(post_id);
        let ops: Vec<SortedSetOp> = followers
            .iter()
            .map(|follower_id| SortedSetOp::Remove {
                key: feed_key(*follower_id),
                member: member.clone(),
            })
            .collect();

        match self.cache.store().pipeline(ops).await {
            Ok(()) => {
                info!("Removed post {} from {} feeds", post_id, followers.len());
                Ok(followers.len())
            }
            Err(e) => {
                warn!("Removing post {} from feeds failed: {}", post_id, e);
                self.cache.metrics().record_error();
                Ok(0)
            }
        }
    }

    /// Post ids from the cached feed set, or `None` when the durable path should answer.
    async fn cached_feed_ids(&self, user_id: UserId, page: Page) -> Option<Vec<PostId>> {
        let key = feed_key(user_id);
        let members = match self
            .cache
            .store()
            .sorted_range_rev(&key, page.offset as usize, page.limit as usize)
            .await
        {
            Ok(members) => members,
            Err(e) => {
                warn!("Reading feed set {} failed, falling back to store: {}", key, e);
                self.cache.metrics().record_error();
                return None;
            }
        };

        if members.is_empty() {
            return None;
        }

        let ids = members
            .iter()
            .filter_map(|member| match parse_feed_member(member) {
                Some(id) => Some(id),
                None => {
                    debug!("Ignoring malformed member '{}' in {}", member, key);
                    None
                }
            })
            .collect();
        Some(ids)
    }

    /// Fetch payloads in order through the cache, dropping stale ids.
    async fn load_posts(&self, ids: Vec<PostId>) -> Result<Vec<Post>, CoreError> {
        let lookups = ids.into_iter().map(|id| async move {
            let result = self
                .cache
                .get_or_load(&post_key(id), self.post_ttl, || async move {
                    self.posts
                        .find_post_by_id(id)
                        .await?
                        .ok_or_else(|| CoreError::not_found(format!("post {}", id)))
                })
                .await;
            (id, result)
        });

        let mut posts = Vec::new();
        for (id, result) in join_all(lookups).await {
            match result {
                Ok(post) if post.is_published() => posts.push(post),
                Ok(post) => debug!("Skipping post {} with status {}", id, post.status),
                Err(e) if e.is_not_found() => debug!("Skipping stale feed entry {}", id),
                Err(e) => return Err(e),
            }
        }
        Ok(posts)
    }

    async fn pull_user_feed(
        &self,
        user_id: UserId,
        sort: FeedSort,
        page: Page,
    ) -> Result<Vec<Post>, CoreError> {
        let following = self.follows.following_ids_of(user_id).await?;
        if following.is_empty() {
            debug!("User {} follows nobody, feed is empty", user_id);
            return Ok(Vec::new());
        }

        let filter = PostFilter::published().by_authors(following);
        let posts = self.posts.list_posts(&filter, sort, page).await?;

        let warmups = posts.iter().map(|post| async move {
            let key = post_key(post.id);
            self.cache.warmup(&key, post, self.post_ttl, false).await
        });
        join_all(warmups).await;

        Ok(posts)
    }
}

/// Feed-set score of a post: its reference time in epoch milliseconds.
fn recency_score(post: &Post) -> f64 {
    post.reference_time().timestamp_millis() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{EmptyFollowGraph, PostStatus};
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use database::{Database, NewPost};
    use feed_cache::{CacheStore, MemoryStore};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    struct Fixture {
        db: Arc<Database>,
        store: Arc<MemoryStore>,
        service: FeedService,
    }

    async fn fixture_with(config: FeedConfig) -> Fixture {
        let db = Arc::new(Database::connect_in_memory().await.unwrap());
        let store = Arc::new(MemoryStore::new());
        let service = FeedService::new(
            db.clone(),
            db.clone(),
            db.clone(),
            CacheAside::new(store.clone()),
            config,
            Duration::from_secs(3600),
        );
        Fixture { db, store, service }
    }

    async fn fixture() -> Fixture {
        fixture_with(FeedConfig::default()).await
    }

    async fn feed_ids(store: &MemoryStore, user_id: UserId) -> Vec<PostId> {
        store
            .sorted_range_rev(&feed_key(user_id), 0, 1000)
            .await
            .unwrap()
            .iter()
            .filter_map(|member| parse_feed_member(member))
            .collect()
    }

    #[tokio::test]
    async fn test_push_reaches_every_follower() {
        let f = fixture().await;
        for follower in 101..=105 {
            f.db.follow(follower, 1, t0()).await.unwrap();
        }
        let post = f.db.create_post(NewPost::published(1, "P1", t0())).await.unwrap();

        let outcome = f.service.push_to_follower_feeds(post.id, 1).await.unwrap();
        assert_eq!(
            outcome,
            PushOutcome::Pushed {
                followers: 5,
                failed_operations: 0
            }
        );
        for follower in 101..=105 {
            assert_eq!(feed_ids(&f.store, follower).await, vec![post.id]);
        }
    }

    #[tokio::test]
    async fn test_push_above_threshold_writes_nothing() {
        let f = fixture().await;
        f.db.follow(101, 1, t0()).await.unwrap();
        f.db.set_follower_count(1, 2000).await.unwrap();
        let post = f.db.create_post(NewPost::published(1, "P1", t0())).await.unwrap();

        let outcome = f.service.push_to_follower_feeds(post.id, 1).await.unwrap();
        assert_eq!(outcome, PushOutcome::Skipped { follower_count: 2000 });
        assert_eq!(f.store.sorted_writes(), 0);
        assert!(feed_ids(&f.store, 101).await.is_empty());
    }

    #[tokio::test]
    async fn test_push_at_threshold_still_fans_out() {
        let f = fixture_with(FeedConfig {
            fanout_threshold: 2,
            ..FeedConfig::default()
        })
        .await;
        f.db.follow(101, 1, t0()).await.unwrap();
        f.db.follow(102, 1, t0()).await.unwrap();
        let post = f.db.create_post(NewPost::published(1, "P1", t0())).await.unwrap();

        let outcome = f.service.push_to_follower_feeds(post.id, 1).await.unwrap();
        assert!(matches!(outcome, PushOutcome::Pushed { followers: 2, .. }));
    }

    #[tokio::test]
    async fn test_push_with_no_followers_is_not_an_error() {
        let f = fixture().await;
        let post = f.db.create_post(NewPost::published(1, "P1", t0())).await.unwrap();

        let outcome = f.service.push_to_follower_feeds(post.id, 1).await.unwrap();
        assert_eq!(
            outcome,
            PushOutcome::Pushed {
                followers: 0,
                failed_operations: 0
            }
        );
        assert_eq!(f.store.sorted_writes(), 0);
    }

    #[tokio::test]
    async fn test_push_of_missing_post_is_not_found() {
        let f = fixture().await;
        let err = f.service.push_to_follower_feeds(404, 1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_feed_set_is_trimmed_to_newest() {
        let f = fixture_with(FeedConfig {
            max_feed_size: 3,
            ..FeedConfig::default()
        })
        .await;
        f.db.follow(101, 1, t0()).await.unwrap();

        let mut ids = Vec::new();
        for i in 0..6 {
            let post = f
                .db
                .create_post(NewPost::published(1, format!("p{}", i), t0() + ChronoDuration::minutes(i)))
                .await
                .unwrap();
            f.service.push_to_follower_feeds(post.id, 1).await.unwrap();
            assert!(f.store.sorted_len(&feed_key(101)).await.unwrap() <= 3);
            ids.push(post.id);
        }

        let expected: Vec<PostId> = ids.iter().rev().take(3).copied().collect();
        assert_eq!(feed_ids(&f.store, 101).await, expected);
    }

    #[tokio::test]
    async fn test_push_survives_cache_outage() {
        let f = fixture().await;
        f.db.follow(101, 1, t0()).await.unwrap();
        f.db.follow(102, 1, t0()).await.unwrap();
        let post = f.db.create_post(NewPost::published(1, "P1", t0())).await.unwrap();
        f.store.set_offline(true);

        let outcome = f.service.push_to_follower_feeds(post.id, 1).await.unwrap();
        assert_eq!(
            outcome,
            PushOutcome::Pushed {
                followers: 2,
                failed_operations: 6
            }
        );
    }

    #[tokio::test]
    async fn test_latest_feed_reads_cached_set() {
        let f = fixture().await;
        f.db.follow(101, 1, t0()).await.unwrap();
        let older = f.db.create_post(NewPost::published(1, "old", t0())).await.unwrap();
        let newer = f
            .db
            .create_post(NewPost::published(1, "new", t0() + ChronoDuration::hours(1)))
            .await
            .unwrap();
        f.service.push_to_follower_feeds(older.id, 1).await.unwrap();
        f.service.push_to_follower_feeds(newer.id, 1).await.unwrap();

        let feed = f.service.get_user_feed(101, 10, 0, FeedSort::Latest).await.unwrap();
        assert_eq!(feed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        let second_page = f.service.get_user_feed(101, 1, 1, FeedSort::Latest).await.unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].id, older.id);

        // Payloads were cached on the first read
        assert!(f.store.exists(&post_key(newer.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_cached_ids_are_skipped() {
        let f = fixture().await;
        f.db.follow(101, 1, t0()).await.unwrap();
        let live = f.db.create_post(NewPost::published(1, "live", t0())).await.unwrap();
        let deleted = f
            .db
            .create_post(NewPost::published(1, "gone", t0() + ChronoDuration::minutes(1)))
            .await
            .unwrap();
        f.service.push_to_follower_feeds(live.id, 1).await.unwrap();
        f.service.push_to_follower_feeds(deleted.id, 1).await.unwrap();
        f.db.set_post_status(deleted.id, PostStatus::Deleted).await.unwrap();
        f.store
            .pipeline(vec![SortedSetOp::Add {
                key: feed_key(101),
                member: feed_member(9999),
                score: recency_score(&live) + 1.0,
            }])
            .await
            .unwrap();

        let feed = f.service.get_user_feed(101, 10, 0, FeedSort::Latest).await.unwrap();
        assert_eq!(feed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![live.id]);
    }

    #[tokio::test]
    async fn test_empty_cache_falls_back_to_followed_authors() {
        let f = fixture().await;
        f.db.follow(101, 1, t0()).await.unwrap();
        f.db.set_follower_count(2, 5000).await.unwrap();
        f.db.follow(101, 2, t0()).await.unwrap();
        let own = f.db.create_post(NewPost::published(1, "a", t0())).await.unwrap();
        let celebrity = f
            .db
            .create_post(NewPost::published(2, "b", t0() + ChronoDuration::minutes(3)))
            .await
            .unwrap();
        f.db.create_post(NewPost::published(3, "not followed", t0())).await.unwrap();

        let feed = f.service.get_user_feed(101, 10, 0, FeedSort::Latest).await.unwrap();
        assert_eq!(feed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![celebrity.id, own.id]);

        // Durable-path results warm the payload cache
        assert!(f.store.exists(&post_key(own.id)).await.unwrap());
        assert!(f.store.exists(&post_key(celebrity.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_following_nobody_gets_empty_page() {
        let f = fixture().await;
        f.db.create_post(NewPost::published(1, "a", t0())).await.unwrap();

        for sort in [FeedSort::Latest, FeedSort::Hot] {
            let feed = f.service.get_user_feed(101, 20, 0, sort).await.unwrap();
            assert!(feed.is_empty());
        }
    }

    #[tokio::test]
    async fn test_hot_feed_ignores_cached_set() {
        let f = fixture().await;
        f.db.follow(101, 1, t0()).await.unwrap();
        let cold = f.db.create_post(NewPost::published(1, "cold", t0())).await.unwrap();
        let hot = f
            .db
            .create_post(NewPost::published(1, "hot", t0() - ChronoDuration::days(1)))
            .await
            .unwrap();
        f.db.update_hotness_score(hot.id, 9.0).await.unwrap();
        f.db.update_hotness_score(cold.id, 1.0).await.unwrap();
        f.service.push_to_follower_feeds(cold.id, 1).await.unwrap();

        let feed = f.service.get_user_feed(101, 10, 0, FeedSort::Hot).await.unwrap();
        assert_eq!(feed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![hot.id, cold.id]);
    }

    #[tokio::test]
    async fn test_cache_outage_serves_feed_from_store() {
        let f = fixture().await;
        f.db.follow(101, 1, t0()).await.unwrap();
        let post = f.db.create_post(NewPost::published(1, "a", t0())).await.unwrap();
        f.service.push_to_follower_feeds(post.id, 1).await.unwrap();
        f.store.set_offline(true);

        let feed = f.service.get_user_feed(101, 10, 0, FeedSort::Latest).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, post.id);
    }

    #[tokio::test]
    async fn test_circle_feed_is_scoped_to_circle() {
        let f = fixture().await;
        let inside = f
            .db
            .create_post(NewPost::published(1, "in", t0()).in_circle(7))
            .await
            .unwrap();
        f.db.create_post(NewPost::published(1, "out", t0()).in_circle(8))
            .await
            .unwrap();

        let feed = f.service.get_circle_feed(7, 10, 0, FeedSort::Latest).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, inside.id);
        assert_eq!(f.store.sorted_writes(), 0);
    }

    #[tokio::test]
    async fn test_remove_from_feeds_clears_sets_and_payload() {
        let f = fixture().await;
        f.db.follow(101, 1, t0()).await.unwrap();
        f.db.follow(102, 1, t0()).await.unwrap();
        let post = f.db.create_post(NewPost::published(1, "bye", t0())).await.unwrap();
        f.service.push_to_follower_feeds(post.id, 1).await.unwrap();
        f.service.get_user_feed(101, 10, 0, FeedSort::Latest).await.unwrap();
        assert!(f.store.exists(&post_key(post.id)).await.unwrap());

        let removed = f.service.remove_from_feeds(post.id).await.unwrap();
        assert_eq!(removed, 2);
        assert!(feed_ids(&f.store, 101).await.is_empty());
        assert!(feed_ids(&f.store, 102).await.is_empty());
        assert!(!f.store.exists(&post_key(post.id)).await.unwrap());

        assert_eq!(f.service.remove_from_feeds(404).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tied_timestamps_order_like_durable_path() {
        let f = fixture().await;
        f.db.follow(101, 1, t0()).await.unwrap();
        let mut ids = Vec::new();
        for i in 0..12 {
            let post = f
                .db
                .create_post(NewPost::published(1, format!("p{}", i), t0()))
                .await
                .unwrap();
            f.service.push_to_follower_feeds(post.id, 1).await.unwrap();
            ids.push(post.id);
        }
        assert!(ids.contains(&9) && ids.contains(&10));
        let newest_first: Vec<PostId> = ids.iter().rev().copied().collect();

        let cached = f.service.get_user_feed(101, 20, 0, FeedSort::Latest).await.unwrap();
        f.store.set_offline(true);
        let durable = f.service.get_user_feed(101, 20, 0, FeedSort::Latest).await.unwrap();

        let cached: Vec<PostId> = cached.iter().map(|p| p.id).collect();
        let durable: Vec<PostId> = durable.iter().map(|p| p.id).collect();
        assert_eq!(cached, newest_first);
        assert_eq!(durable, newest_first);
    }

    #[tokio::test]
    async fn test_trim_among_tied_timestamps_keeps_highest_ids() {
        let f = fixture_with(FeedConfig {
            max_feed_size: 3,
            ..FeedConfig::default()
        })
        .await;
        f.db.follow(101, 1, t0()).await.unwrap();
        let mut ids = Vec::new();
        for i in 0..12 {
            let post = f
                .db
                .create_post(NewPost::published(1, format!("p{}", i), t0()))
                .await
                .unwrap();
            f.service.push_to_follower_feeds(post.id, 1).await.unwrap();
            ids.push(post.id);
        }

        let expected: Vec<PostId> = ids.iter().rev().take(3).copied().collect();
        assert_eq!(feed_ids(&f.store, 101).await, expected);
    }

    #[tokio::test]
    async fn test_partial_pipeline_failure_counts_only_failed_operations() {
        let f = fixture().await;
        f.db.follow(101, 1, t0()).await.unwrap();
        f.db.follow(102, 1, t0()).await.unwrap();
        // A plain value under 102's feed key rejects the ordered-set writes
        f.store
            .set(&feed_key(102), "not a feed", Duration::from_secs(60))
            .await
            .unwrap();
        let post = f.db.create_post(NewPost::published(1, "P1", t0())).await.unwrap();

        let outcome = f.service.push_to_follower_feeds(post.id, 1).await.unwrap();
        assert_eq!(
            outcome,
            PushOutcome::Pushed {
                followers: 2,
                failed_operations: 2
            }
        );
        assert_eq!(feed_ids(&f.store, 101).await, vec![post.id]);
    }

    #[tokio::test]
    async fn test_empty_follow_graph_pushes_nothing_and_reads_empty() {
        let db = Arc::new(Database::connect_in_memory().await.unwrap());
        let store = Arc::new(MemoryStore::new());
        let service = FeedService::new(
            db.clone(),
            Arc::new(EmptyFollowGraph),
            db.clone(),
            CacheAside::new(store.clone()),
            FeedConfig::default(),
            Duration::from_secs(3600),
        );
        db.follow(101, 1, t0()).await.unwrap();
        let post = db.create_post(NewPost::published(1, "P1", t0())).await.unwrap();

        let outcome = service.push_to_follower_feeds(post.id, 1).await.unwrap();
        assert_eq!(
            outcome,
            PushOutcome::Pushed {
                followers: 0,
                failed_operations: 0
            }
        );
        assert_eq!(store.sorted_writes(), 0);

        for sort in [FeedSort::Latest, FeedSort::Hot] {
            assert!(service.get_user_feed(101, 10, 0, sort).await.unwrap().is_empty());
        }
        assert_eq!(service.remove_from_feeds(post.id).await.unwrap(), 0);
    }
}
