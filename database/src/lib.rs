//! SQLite persistence for posts, entity aggregates, and the follow graph.
//!
//! Timestamps are stored as Unix epoch milliseconds so ordering in SQL matches ordering in time.

use agora_core::{
    CoreError, CountDelta, DatabaseError, EntityCount, EntityType, FeedSort, FollowGraph, Page,
    Post, PostFilter, PostId, PostRepository, PostStatus, UserId, UserProfiles,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, error, info};

#[cfg(test)]
mod tests;

const POST_COLUMNS: &str = "id, author_id, circle_id, title, content, status, hotness_score, published_at, created_at";

/// Fields supplied when creating a post. The id is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: UserId,
    pub circle_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NewPost {
    /// A post that was published at `at`.
    pub fn published(author_id: UserId, title: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            author_id,
            circle_id: None,
            title: title.into(),
            content: String::new(),
            status: PostStatus::Published,
            published_at: Some(at),
            created_at: at,
        }
    }

    pub fn in_circle(mut self, circle_id: i64) -> Self {
        self.circle_id = Some(circle_id);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database {}: {}", url, e);
                DatabaseError::ConnectionFailed {
                    reason: e.to_string(),
                }
            })?;

        info!("Connected to database {}", url);
        Ok(Self { pool })
    }

    /// A private in-memory database with migrations applied.
    ///
    /// The pool holds a single connection that never idles out, since each SQLite memory
    /// connection is its own database.
    pub async fn connect_in_memory() -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| {
                error!("Database migration failed: {}", e);
                DatabaseError::MigrationFailed {
                    migration: e.to_string(),
                }
            })?;
        debug!("Database migrations applied");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), CoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(sql_error)?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn create_post(&self, post: NewPost) -> Result<Post, CoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO posts (author_id, circle_id, title, content, status, published_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            POST_COLUMNS
        ))
        .bind(post.author_id)
        .bind(post.circle_id)
        .bind(post.title.as_str())
        .bind(post.content.as_str())
        .bind(post.status.as_str())
        .bind(post.published_at.map(|t| t.timestamp_millis()))
        .bind(post.created_at.timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(sql_error)?;

        post_from_row(&row)
    }

    pub async fn set_post_status(&self, id: PostId, status: PostStatus) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE posts SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(sql_error)?;

        if result.rows_affected() == 0 {
            return Err(post_not_found(id));
        }
        Ok(())
    }

    /// Records that `follower_id` follows `followee_id` and bumps the followee's follower count.
    /// Following twice is a no-op.
    pub async fn follow(
        &self,
        follower_id: UserId,
        followee_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(sql_error)?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(follower_id)
        .bind(followee_id)
        .bind(at.timestamp_millis())
        .execute(&mut *tx)
        .await
        .map_err(sql_error)?;

        if inserted.rows_affected() > 0 {
            sqlx::query(
                "INSERT INTO user_profiles (user_id, follower_count) VALUES (?, 1) \
                 ON CONFLICT(user_id) DO UPDATE SET follower_count = follower_count + 1",
            )
            .bind(followee_id)
            .execute(&mut *tx)
            .await
            .map_err(sql_error)?;
        }

        tx.commit().await.map_err(sql_error)?;
        Ok(())
    }

    pub async fn unfollow(&self, follower_id: UserId, followee_id: UserId) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(sql_error)?;

        let removed = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(follower_id)
            .bind(followee_id)
            .execute(&mut *tx)
            .await
            .map_err(sql_error)?;

        if removed.rows_affected() > 0 {
            sqlx::query(
                "UPDATE user_profiles SET follower_count = MAX(follower_count - 1, 0) WHERE user_id = ?",
            )
            .bind(followee_id)
            .execute(&mut *tx)
            .await
            .map_err(sql_error)?;
        }

        tx.commit().await.map_err(sql_error)?;
        Ok(())
    }

    /// Overwrites the denormalised follower count of `user_id`.
    pub async fn set_follower_count(&self, user_id: UserId, count: i64) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO user_profiles (user_id, follower_count) VALUES (?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET follower_count = excluded.follower_count",
        )
        .bind(user_id)
        .bind(count.max(0))
        .execute(&self.pool)
        .await
        .map_err(sql_error)?;
        Ok(())
    }
}

#[async_trait]
impl PostRepository for Database {
    async fn find_post_by_id(&self, id: PostId) -> Result<Option<Post>, CoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sql_error)?;

        row.as_ref().map(post_from_row).transpose()
    }

    async fn update_hotness_score(&self, id: PostId, score: f64) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE posts SET hotness_score = ? WHERE id = ?")
            .bind(score)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(sql_error)?;

        if result.rows_affected() == 0 {
            return Err(post_not_found(id));
        }
        debug!("Stored hotness score {} for post {}", score, id);
        Ok(())
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        sort: FeedSort,
        page: Page,
    ) -> Result<Vec<Post>, CoreError> {
        if matches!(&filter.author_ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM posts WHERE 1 = 1", POST_COLUMNS));

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(circle_id) = filter.circle_id {
            query.push(" AND circle_id = ").push_bind(circle_id);
        }
        // One JSON parameter keeps large following lists under SQLite's bind-variable limit
        if let Some(author_ids) = &filter.author_ids {
            query
                .push(" AND author_id IN (SELECT value FROM json_each(")
                .push_bind(serde_json::to_string(author_ids)?)
                .push("))");
        }

        query.push(match sort {
            FeedSort::Latest => " ORDER BY COALESCE(published_at, created_at) DESC, id DESC",
            FeedSort::Hot => " ORDER BY hotness_score DESC, id DESC",
        });
        query
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(page.offset));

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(sql_error)?;

        rows.iter().map(post_from_row).collect()
    }

    async fn find_entity_count(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<Option<EntityCount>, CoreError> {
        let row = sqlx::query(
            "SELECT entity_type, entity_id, upvotes, downvotes, comment_count, favorite_count, updated_at \
             FROM entity_counts WHERE entity_type = ? AND entity_id = ?",
        )
        .bind(entity_type.as_str())
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sql_error)?;

        row.as_ref().map(entity_count_from_row).transpose()
    }

    async fn increment_entity_count(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        delta: CountDelta,
    ) -> Result<EntityCount, CoreError> {
        let now = Utc::now().timestamp_millis();
        let row = sqlx::query(
            "INSERT INTO entity_counts \
                 (entity_type, entity_id, upvotes, downvotes, comment_count, favorite_count, updated_at) \
             VALUES (?, ?, MAX(?, 0), MAX(?, 0), MAX(?, 0), MAX(?, 0), ?) \
             ON CONFLICT(entity_type, entity_id) DO UPDATE SET \
                 upvotes = MAX(entity_counts.upvotes + ?, 0), \
                 downvotes = MAX(entity_counts.downvotes + ?, 0), \
                 comment_count = MAX(entity_counts.comment_count + ?, 0), \
                 favorite_count = MAX(entity_counts.favorite_count + ?, 0), \
                 updated_at = excluded.updated_at \
             RETURNING entity_type, entity_id, upvotes, downvotes, comment_count, favorite_count, updated_at",
        )
        .bind(entity_type.as_str())
        .bind(entity_id)
        .bind(delta.upvotes)
        .bind(delta.downvotes)
        .bind(delta.comments)
        .bind(delta.favorites)
        .bind(now)
        .bind(delta.upvotes)
        .bind(delta.downvotes)
        .bind(delta.comments)
        .bind(delta.favorites)
        .fetch_one(&self.pool)
        .await
        .map_err(sql_error)?;

        entity_count_from_row(&row)
    }
}

#[async_trait]
impl FollowGraph for Database {
    async fn follower_ids_of(&self, author_id: UserId) -> Result<Vec<UserId>, CoreError> {
        let rows = sqlx::query("SELECT follower_id FROM follows WHERE followee_id = ? ORDER BY follower_id")
            .bind(author_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sql_error)?;

        rows.iter()
            .map(|row| row.try_get::<i64, _>("follower_id").map_err(sql_error))
            .collect()
    }

    async fn following_ids_of(&self, user_id: UserId) -> Result<Vec<UserId>, CoreError> {
        let rows = sqlx::query("SELECT followee_id FROM follows WHERE follower_id = ? ORDER BY followee_id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sql_error)?;

        rows.iter()
            .map(|row| row.try_get::<i64, _>("followee_id").map_err(sql_error))
            .collect()
    }
}

#[async_trait]
impl UserProfiles for Database {
    /// Users without a profile row have no followers.
    async fn follower_count_of(&self, user_id: UserId) -> Result<i64, CoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT follower_count FROM user_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sql_error)?;

        Ok(count.unwrap_or(0))
    }
}

fn sql_error(e: sqlx::Error) -> CoreError {
    match e {
        sqlx::Error::Database(ref db) if db.message().contains("database is locked") => {
            CoreError::Database(DatabaseError::DatabaseLocked)
        }
        other => CoreError::Database(DatabaseError::Sql(other)),
    }
}

fn post_not_found(id: PostId) -> CoreError {
    CoreError::Database(DatabaseError::RowNotFound {
        entity: format!("post {}", id),
    })
}

fn timestamp(table: &str, millis: i64) -> Result<DateTime<Utc>, CoreError> {
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        CoreError::Database(DatabaseError::CorruptRow {
            table: table.to_string(),
            details: format!("timestamp {} out of range", millis),
        })
    })
}

fn post_from_row(row: &SqliteRow) -> Result<Post, CoreError> {
    let status: String = row.try_get("status").map_err(sql_error)?;
    let status = status.parse::<PostStatus>().map_err(|e| {
        CoreError::Database(DatabaseError::CorruptRow {
            table: "posts".to_string(),
            details: e.to_string(),
        })
    })?;
    let published_at: Option<i64> = row.try_get("published_at").map_err(sql_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(sql_error)?;

    Ok(Post {
        id: row.try_get("id").map_err(sql_error)?,
        author_id: row.try_get("author_id").map_err(sql_error)?,
        circle_id: row.try_get("circle_id").map_err(sql_error)?,
        title: row.try_get("title").map_err(sql_error)?,
        content: row.try_get("content").map_err(sql_error)?,
        status,
        hotness_score: row.try_get("hotness_score").map_err(sql_error)?,
        published_at: published_at.map(|ms| timestamp("posts", ms)).transpose()?,
        created_at: timestamp("posts", created_at)?,
    })
}

fn entity_count_from_row(row: &SqliteRow) -> Result<EntityCount, CoreError> {
    let entity_type: String = row.try_get("entity_type").map_err(sql_error)?;
    let entity_type = entity_type.parse::<EntityType>().map_err(|e| {
        CoreError::Database(DatabaseError::CorruptRow {
            table: "entity_counts".to_string(),
            details: e.to_string(),
        })
    })?;
    let updated_at: i64 = row.try_get("updated_at").map_err(sql_error)?;

    Ok(EntityCount {
        entity_type,
        entity_id: row.try_get("entity_id").map_err(sql_error)?,
        upvotes: row.try_get("upvotes").map_err(sql_error)?,
        downvotes: row.try_get("downvotes").map_err(sql_error)?,
        comment_count: row.try_get("comment_count").map_err(sql_error)?,
        favorite_count: row.try_get("favorite_count").map_err(sql_error)?,
        updated_at: timestamp("entity_counts", updated_at)?,
    })
}
