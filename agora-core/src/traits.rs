//! Interfaces of the collaborators the feed subsystem consumes but does not own.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    CoreError, CountDelta, EntityCount, EntityType, FeedSort, Page, Post, PostFilter, PostId,
    UserId,
};

/// Durable store of posts and their vote/comment aggregates.
#[async_trait]
pub trait PostRepository: Debug + Send + Sync {
    async fn find_post_by_id(&self, id: PostId) -> Result<Option<Post>, CoreError>;

    /// Fails with a not-found error when no such post exists.
    async fn update_hotness_score(&self, id: PostId, score: f64) -> Result<(), CoreError>;

    async fn list_posts(
        &self,
        filter: &PostFilter,
        sort: FeedSort,
        page: Page,
    ) -> Result<Vec<Post>, CoreError>;

    async fn find_entity_count(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<Option<EntityCount>, CoreError>;

    /// Applies `delta` in one atomic statement, creating the aggregate on first use.
    async fn increment_entity_count(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        delta: CountDelta,
    ) -> Result<EntityCount, CoreError>;
}

#[async_trait]
pub trait FollowGraph: Debug + Send + Sync {
    async fn follower_ids_of(&self, author_id: UserId) -> Result<Vec<UserId>, CoreError>;

    async fn following_ids_of(&self, user_id: UserId) -> Result<Vec<UserId>, CoreError>;
}

#[async_trait]
pub trait UserProfiles: Debug + Send + Sync {
    async fn follower_count_of(&self, user_id: UserId) -> Result<i64, CoreError>;
}

/// Read-side search projection. Updates are fire-and-forget from the caller's point of view.
#[async_trait]
pub trait SearchIndex: Debug + Send + Sync {
    async fn update_score(&self, post_id: PostId, score: f64) -> Result<(), CoreError>;
}

/// A follow graph with no edges.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyFollowGraph;

#[async_trait]
impl FollowGraph for EmptyFollowGraph {
    async fn follower_ids_of(&self, _author_id: UserId) -> Result<Vec<UserId>, CoreError> {
        Ok(Vec::new())
    }

    async fn following_ids_of(&self, _user_id: UserId) -> Result<Vec<UserId>, CoreError> {
        Ok(Vec::new())
    }
}
