use agora_core::{
    CacheError, CoreError, EntityType, Outcome, PostId, PostRepository, SearchIndex,
    SideEffectFailure,
};
use feed_cache::keys::post_key;
use feed_cache::CacheAside;
use ranking::RankingEngine;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::DomainEvent;

pub const SEARCH_PROJECTION: &str = "search_projection";
pub const POST_CACHE: &str = "post_cache";

/// Recomputes and persists a post's hotness score after vote and comment activity.
///
/// Post and aggregate are always read from the durable store. The score is persisted even when
/// unchanged, so replaying an event is harmless. Projection to search and the payload cache is
/// best-effort and reported through [`Outcome`].
#[derive(Debug, Clone)]
pub struct HotnessRecalculator {
    posts: Arc<dyn PostRepository>,
    ranking: RankingEngine,
    search: Arc<dyn SearchIndex>,
    cache: CacheAside,
}

impl HotnessRecalculator {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        ranking: RankingEngine,
        search: Arc<dyn SearchIndex>,
        cache: CacheAside,
    ) -> Self {
        Self {
            posts,
            ranking,
            search,
            cache,
        }
    }

    /// Returns `None` for events that do not score a post, such as votes on comments.
    pub async fn handle(
        &self,
        event: &DomainEvent,
        token: &CancellationToken,
    ) -> Result<Option<Outcome<f64>>, CoreError> {
        match event.scored_post() {
            Some(post_id) => self.recalculate(post_id, token).await.map(Some),
            None => {
                debug!("Event {} does not affect a post score", event.topic());
                Ok(None)
            }
        }
    }

    pub async fn recalculate(
        &self,
        post_id: PostId,
        token: &CancellationToken,
    ) -> Result<Outcome<f64>, CoreError> {
        let post = self
            .posts
            .find_post_by_id(post_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("post {}", post_id)))?;
        let counts = self
            .posts
            .find_entity_count(EntityType::Post, post_id)
            .await?;

        let score = self.ranking.score(&post, counts.as_ref());

        if token.is_cancelled() {
            return Err(CoreError::Cancelled {
                operation: format!("recalculate post {}", post_id),
            });
        }
        self.posts.update_hotness_score(post_id, score).await?;
        info!(
            "Recalculated hotness of post {}: {} -> {}",
            post_id, post.hotness_score, score
        );

        let mut side_effects = Vec::new();

        if let Err(e) = self.search.update_score(post_id, score).await {
            warn!("Search projection of post {} failed: {}", post_id, e);
            side_effects.push(SideEffectFailure {
                effect: SEARCH_PROJECTION,
                error: e,
            });
        }

        if !self.cache.invalidate(&post_key(post_id)).await {
            side_effects.push(SideEffectFailure {
                effect: POST_CACHE,
                error: CacheError::Unavailable {
                    reason: format!("could not invalidate {}", post_key(post_id)),
                }
                .into(),
            });
        }

        Ok(Outcome::from_parts(score, side_effects))
    }
}
