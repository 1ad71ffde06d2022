use crate::{Database, NewPost};
use agora_core::{
    CountDelta, EntityType, FeedSort, FollowGraph, Page, PostFilter, PostRepository, PostStatus,
    UserProfiles,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::env;

async fn setup_test_db() -> Database {
    Database::connect_in_memory()
        .await
        .expect("Failed to open in-memory database")
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

#[tokio::test]
async fn test_file_database_connection_and_migrations() {
    let db_path = env::temp_dir().join(format!(
        "test_agora_{}_{}.db",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let db = Database::connect(&db_url, 2)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations().await.expect("Failed to run migrations");
    // Migrations are idempotent
    db.run_migrations().await.expect("Failed to rerun migrations");
    db.health_check().await.expect("Health check failed");
    db.close().await;

    let _ = std::fs::remove_file(db_path);
}

#[tokio::test]
async fn test_create_and_find_post() {
    let db = setup_test_db().await;
    let created = db
        .create_post(NewPost::published(7, "first", t0()).in_circle(3))
        .await
        .unwrap();

    let found = db.find_post_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(found, created);
    assert_eq!(found.author_id, 7);
    assert_eq!(found.circle_id, Some(3));
    assert_eq!(found.status, PostStatus::Published);
    assert_eq!(found.published_at, Some(t0()));
    assert_eq!(found.hotness_score, 0.0);

    assert!(db.find_post_by_id(created.id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_hotness_score() {
    let db = setup_test_db().await;
    let post = db.create_post(NewPost::published(1, "p", t0())).await.unwrap();

    db.update_hotness_score(post.id, 2.5).await.unwrap();
    let stored = db.find_post_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.hotness_score, 2.5);

    let err = db.update_hotness_score(9999, 1.0).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_list_posts_filters_and_sorts() {
    let db = setup_test_db().await;
    let a = db.create_post(NewPost::published(1, "a", t0())).await.unwrap();
    let b = db
        .create_post(NewPost::published(2, "b", t0() + Duration::minutes(5)).in_circle(9))
        .await
        .unwrap();
    let c = db
        .create_post(NewPost::published(1, "c", t0() + Duration::minutes(10)))
        .await
        .unwrap();
    let draft = db
        .create_post(NewPost {
            status: PostStatus::Draft,
            published_at: None,
            ..NewPost::published(1, "draft", t0() + Duration::hours(1))
        })
        .await
        .unwrap();

    let latest = db
        .list_posts(&PostFilter::published(), FeedSort::Latest, Page::default())
        .await
        .unwrap();
    let ids: Vec<_> = latest.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![c.id, b.id, a.id]);
    assert!(!ids.contains(&draft.id));

    db.update_hotness_score(a.id, 10.0).await.unwrap();
    db.update_hotness_score(b.id, 5.0).await.unwrap();
    let hot = db
        .list_posts(&PostFilter::published(), FeedSort::Hot, Page::new(2, 0))
        .await
        .unwrap();
    assert_eq!(hot.iter().map(|p| p.id).collect::<Vec<_>>(), vec![a.id, b.id]);

    let circle = db
        .list_posts(&PostFilter::published().in_circle(9), FeedSort::Latest, Page::default())
        .await
        .unwrap();
    assert_eq!(circle.len(), 1);
    assert_eq!(circle[0].id, b.id);

    let by_author = db
        .list_posts(
            &PostFilter::published().by_authors(vec![1]),
            FeedSort::Latest,
            Page::new(10, 1),
        )
        .await
        .unwrap();
    assert_eq!(by_author.iter().map(|p| p.id).collect::<Vec<_>>(), vec![a.id]);

    let nobody = db
        .list_posts(
            &PostFilter::published().by_authors(Vec::new()),
            FeedSort::Latest,
            Page::default(),
        )
        .await
        .unwrap();
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn test_list_posts_by_many_authors() {
    let db = setup_test_db().await;
    let first = db.create_post(NewPost::published(1, "first", t0())).await.unwrap();
    let last = db
        .create_post(NewPost::published(40_000, "last", t0() + Duration::minutes(1)))
        .await
        .unwrap();
    db.create_post(NewPost::published(50_000, "unfollowed", t0())).await.unwrap();

    // More authors than SQLite allows bind variables
    let authors: Vec<i64> = (1..=40_000).collect();
    let posts = db
        .list_posts(
            &PostFilter::published().by_authors(authors),
            FeedSort::Latest,
            Page::new(10, 0),
        )
        .await
        .unwrap();
    assert_eq!(posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![last.id, first.id]);
}

#[tokio::test]
async fn test_increment_entity_count_upserts() {
    let db = setup_test_db().await;
    assert!(db
        .find_entity_count(EntityType::Post, 1)
        .await
        .unwrap()
        .is_none());

    let first = db
        .increment_entity_count(EntityType::Post, 1, CountDelta::upvote(1))
        .await
        .unwrap();
    assert_eq!((first.upvotes, first.downvotes), (1, 0));

    db.increment_entity_count(EntityType::Post, 1, CountDelta::upvote(2))
        .await
        .unwrap();
    let after = db
        .increment_entity_count(EntityType::Post, 1, CountDelta::downvote(1))
        .await
        .unwrap();
    assert_eq!(after.net_votes(), 2);

    // Counters never go negative
    let clamped = db
        .increment_entity_count(EntityType::Post, 1, CountDelta::downvote(-5))
        .await
        .unwrap();
    assert_eq!(clamped.downvotes, 0);

    // Same id under another entity type is a separate aggregate
    let comment = db
        .increment_entity_count(EntityType::Comment, 1, CountDelta::comment(1))
        .await
        .unwrap();
    assert_eq!(comment.comment_count, 1);
    assert_eq!(comment.upvotes, 0);

    let stored = db
        .find_entity_count(EntityType::Post, 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.upvotes, 3);
}

#[tokio::test]
async fn test_concurrent_increments_are_not_lost() {
    let db = setup_test_db().await;
    let mut handles = Vec::new();
    for _ in 0..20 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.increment_entity_count(EntityType::Post, 42, CountDelta::upvote(1))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let counts = db
        .find_entity_count(EntityType::Post, 42)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counts.upvotes, 20);
}

#[tokio::test]
async fn test_follow_graph_and_follower_counts() {
    let db = setup_test_db().await;
    for follower in [11, 12, 13] {
        db.follow(follower, 1, t0()).await.unwrap();
    }
    db.follow(11, 1, t0()).await.unwrap();
    db.follow(11, 2, t0()).await.unwrap();

    assert_eq!(db.follower_ids_of(1).await.unwrap(), vec![11, 12, 13]);
    assert_eq!(db.following_ids_of(11).await.unwrap(), vec![1, 2]);
    assert_eq!(db.follower_count_of(1).await.unwrap(), 3);
    assert_eq!(db.follower_count_of(99).await.unwrap(), 0);

    db.unfollow(12, 1).await.unwrap();
    db.unfollow(12, 1).await.unwrap();
    assert_eq!(db.follower_ids_of(1).await.unwrap(), vec![11, 13]);
    assert_eq!(db.follower_count_of(1).await.unwrap(), 2);

    db.set_follower_count(5, 2000).await.unwrap();
    assert_eq!(db.follower_count_of(5).await.unwrap(), 2000);
}

#[tokio::test]
async fn test_set_post_status() {
    let db = setup_test_db().await;
    let post = db.create_post(NewPost::published(1, "p", t0())).await.unwrap();

    db.set_post_status(post.id, PostStatus::Deleted).await.unwrap();
    let stored = db.find_post_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PostStatus::Deleted);
    assert!(db.set_post_status(404, PostStatus::Hidden).await.unwrap_err().is_not_found());
}
