use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

pub type PostId = i64;
pub type UserId = i64;
pub type CircleId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Pending,
    Published,
    Hidden,
    Deleted,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Published => "published",
            PostStatus::Hidden => "hidden",
            PostStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "pending" => Ok(PostStatus::Pending),
            "published" => Ok(PostStatus::Published),
            "hidden" => Ok(PostStatus::Hidden),
            "deleted" => Ok(PostStatus::Deleted),
            other => Err(CoreError::InvalidInput {
                message: format!("unknown post status '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub circle_id: Option<CircleId>,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub hotness_score: f64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Publication time if the post has been published, creation time otherwise.
    pub fn reference_time(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.created_at)
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Post,
    Comment,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Post => "post",
            EntityType::Comment => "comment",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(EntityType::Post),
            "comment" => Ok(EntityType::Comment),
            other => Err(CoreError::InvalidInput {
                message: format!("unknown entity type '{}'", other),
            }),
        }
    }
}

/// Vote/comment aggregate for one votable entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCount {
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub comment_count: i64,
    pub favorite_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl EntityCount {
    /// The aggregate of an entity nobody has interacted with yet.
    pub fn empty(entity_type: EntityType, entity_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            entity_type,
            entity_id,
            upvotes: 0,
            downvotes: 0,
            comment_count: 0,
            favorite_count: 0,
            updated_at: now,
        }
    }

    pub fn net_votes(&self) -> i64 {
        self.upvotes - self.downvotes
    }
}

/// Signed adjustments applied atomically to an [`EntityCount`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountDelta {
    pub upvotes: i64,
    pub downvotes: i64,
    pub comments: i64,
    pub favorites: i64,
}

impl CountDelta {
    pub fn upvote(n: i64) -> Self {
        Self {
            upvotes: n,
            ..Default::default()
        }
    }

    pub fn downvote(n: i64) -> Self {
        Self {
            downvotes: n,
            ..Default::default()
        }
    }

    pub fn comment(n: i64) -> Self {
        Self {
            comments: n,
            ..Default::default()
        }
    }
}

/// Ordering requested by a feed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSort {
    #[default]
    Latest,
    Hot,
}

impl FromStr for FeedSort {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" | "new" | "recent" | "" => Ok(FeedSort::Latest),
            "hot" | "hotness" => Ok(FeedSort::Hot),
            other => Err(CoreError::InvalidInput {
                message: format!("unknown feed sort '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub circle_id: Option<CircleId>,
    /// Restrict to these authors. `Some(vec![])` matches nothing.
    pub author_ids: Option<Vec<UserId>>,
}

impl PostFilter {
    pub fn published() -> Self {
        Self {
            status: Some(PostStatus::Published),
            ..Default::default()
        }
    }

    pub fn in_circle(mut self, circle_id: CircleId) -> Self {
        self.circle_id = Some(circle_id);
        self
    }

    pub fn by_authors(mut self, author_ids: Vec<UserId>) -> Self {
        self.author_ids = Some(author_ids);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub const MAX_LIMIT: u32 = 100;

    /// Clamps `limit` to `1..=MAX_LIMIT`.
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(20, 0)
    }
}
