use agora_core::{Clock, EntityCount, Post, SystemClock};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::algorithm::Algorithm;

/// Computes hotness scores with one algorithm chosen at construction.
///
/// Scores depend only on the post's reference time, its aggregate and the evaluation time, so
/// recomputing with unchanged inputs gives the same value.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    algorithm: Algorithm,
    clock: Arc<dyn Clock>,
}

impl RankingEngine {
    pub fn new(algorithm: Algorithm) -> Self {
        Self::with_clock(algorithm, Arc::new(SystemClock))
    }

    pub fn with_clock(algorithm: Algorithm, clock: Arc<dyn Clock>) -> Self {
        Self { algorithm, clock }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Score `post` at the current time. A missing aggregate counts as no votes.
    pub fn score(&self, post: &Post, counts: Option<&EntityCount>) -> f64 {
        self.score_at(post, counts, self.clock.now())
    }

    pub fn score_at(&self, post: &Post, counts: Option<&EntityCount>, now: DateTime<Utc>) -> f64 {
        let net_votes = counts.map(EntityCount::net_votes).unwrap_or(0);
        let elapsed_secs = elapsed_secs(post.reference_time(), now);
        let score = self.algorithm.score(net_votes, elapsed_secs);
        debug!(
            "Scored post {} with {}: net_votes={} elapsed={}s score={}",
            post.id, self.algorithm, net_votes, elapsed_secs, score
        );
        score
    }
}

/// Seconds from `since` to `now`, never negative.
fn elapsed_secs(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - since).num_milliseconds().max(0);
    millis as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{EntityType, MockClock, PostStatus};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
    }

    fn post_published_at(published_at: DateTime<Utc>) -> Post {
        Post {
            id: 1,
            author_id: 10,
            circle_id: None,
            title: "hello".to_string(),
            content: String::new(),
            status: PostStatus::Published,
            hotness_score: 0.0,
            published_at: Some(published_at),
            created_at: published_at - Duration::hours(1),
        }
    }

    fn counts(upvotes: i64, downvotes: i64) -> EntityCount {
        EntityCount {
            upvotes,
            downvotes,
            ..EntityCount::empty(EntityType::Post, 1, now())
        }
    }

    #[test]
    fn test_fresh_post_with_positive_votes_scores_above_zero() {
        let engine = RankingEngine::with_clock(Algorithm::DecayBySign, Arc::new(MockClock::new(now())));
        let post = post_published_at(now());
        let score = engine.score(&post, Some(&counts(10, 2)));
        assert!(score > 0.0);
        assert!((score - 8f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn test_same_post_a_day_older_scores_differently() {
        let engine = RankingEngine::new(Algorithm::DecayBySign);
        let fresh = post_published_at(now());
        let older = post_published_at(now() - Duration::hours(24));
        let c = counts(10, 2);

        let fresh_score = engine.score_at(&fresh, Some(&c), now());
        let older_score = engine.score_at(&older, Some(&c), now());
        assert_ne!(fresh_score, older_score);
        assert!((older_score - fresh_score - 86_400.0 / 45_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let clock = Arc::new(MockClock::new(now()));
        for algorithm in [Algorithm::DecayBySign, Algorithm::GravityDecay] {
            let engine = RankingEngine::with_clock(algorithm, clock.clone());
            let post = post_published_at(now() - Duration::hours(5));
            let c = counts(42, 7);
            assert_eq!(engine.score(&post, Some(&c)), engine.score(&post, Some(&c)));
        }
    }

    #[test]
    fn test_unpublished_post_ages_from_creation() {
        let engine = RankingEngine::new(Algorithm::GravityDecay);
        let mut post = post_published_at(now());
        post.published_at = None;
        post.created_at = now() - Duration::hours(10);

        let score = engine.score_at(&post, Some(&counts(5, 0)), now());
        let expected = 5.0 / 12.0_f64.powf(1.8);
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_missing_counts_score_as_zero_votes() {
        let engine = RankingEngine::new(Algorithm::DecayBySign);
        let post = post_published_at(now() - Duration::hours(3));
        assert_eq!(engine.score_at(&post, None, now()), 0.0);
    }

    #[test]
    fn test_future_publication_is_clamped_to_zero_age() {
        let engine = RankingEngine::new(Algorithm::GravityDecay);
        let post = post_published_at(now() + Duration::minutes(5));
        let score = engine.score_at(&post, Some(&counts(4, 0)), now());
        assert!((score - 4.0 / 2.0_f64.powf(1.8)).abs() < 1e-12);
    }

    #[test]
    fn test_gravity_decays_with_age() {
        let clock = Arc::new(MockClock::new(now()));
        let engine = RankingEngine::with_clock(Algorithm::GravityDecay, clock.clone());
        let post = post_published_at(now());
        let c = counts(30, 3);

        let mut previous = engine.score(&post, Some(&c));
        for _ in 0..5 {
            clock.advance(Duration::hours(6));
            let next = engine.score(&post, Some(&c));
            assert!(next >= 0.0);
            assert!(next < previous);
            previous = next;
        }
    }
}
