// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{raw_item, setup_db};
use socialcrawl::domain::models::platform::Platform;
use socialcrawl::domain::models::post::PostQuery;
use socialcrawl::domain::models::raw_item::{AcquiredContent, AcquisitionTier, Confidence};
use sea_orm::ConnectionTrait;
use socialcrawl::domain::models::creator::Creator;
use socialcrawl::domain::repositories::crawl_task_repository::RepositoryError;
use socialcrawl::domain::repositories::creator_repository::CreatorRepository;
use socialcrawl::domain::repositories::post_repository::PostRepository;
use socialcrawl::domain::services::content_service::{fingerprint, ContentNormalizer, PersistSummary};
use socialcrawl::infrastructure::repositories::creator_repo_impl::CreatorRepositoryImpl;
use socialcrawl::infrastructure::repositories::post_repo_impl::PostRepositoryImpl;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

async fn normalizer() -> (super::helpers::TestDb, Arc<dyn PostRepository>, ContentNormalizer) {
    let db = setup_db().await;
    let posts: Arc<dyn PostRepository> = Arc::new(PostRepositoryImpl::new(db.db.clone()));
    let normalizer = ContentNormalizer::new(posts.clone(), Duration::from_secs(5));
    (db, posts, normalizer)
}

async fn count(posts: &Arc<dyn PostRepository>) -> u64 {
    posts
        .query(PostQuery {
            limit: 100,
            ..Default::default()
        })
        .await
        .unwrap()
        .1
}

/// 同一批内容重复提交只入库一次
#[tokio::test]
async fn test_persisting_same_batch_twice_is_idempotent() {
    let (_db, posts, normalizer) = normalizer().await;
    let creator_id = Some(Uuid::new_v4());
    let content = AcquiredContent::new(
        vec![
            raw_item("a", "<h1>Title A</h1>", "Body &amp; more"),
            raw_item("b", "Title B", "Body B"),
        ],
        AcquisitionTier::Direct,
        "http",
    );

    let first = normalizer.persist(creator_id, Platform::Weibo, &content).await;
    assert_eq!(
        first,
        PersistSummary {
            saved: 2,
            duplicates: 0,
            failed: 0
        }
    );

    let second = normalizer.persist(creator_id, Platform::Weibo, &content).await;
    assert_eq!(second.saved, 0);
    assert_eq!(second.duplicates, 2);
    assert_eq!(count(&posts).await, 2);

    let stored = posts
        .query(PostQuery {
            creator_id,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap()
        .0;
    let a = stored.iter().find(|p| p.origin_id.as_deref() == Some("a")).unwrap();
    assert_eq!(a.title, "Title A");
    assert_eq!(a.body, "Body & more");
    assert_eq!(a.content_hash, fingerprint("Title A", "Body & more"));
    assert_eq!(a.confidence, Confidence::Direct);
    assert_eq!(a.source, "http");
}

/// 同一创作者下相同的原生ID视为重复，即使内容已变化
#[tokio::test]
async fn test_dedup_by_origin_id_within_creator() {
    let (_db, posts, normalizer) = normalizer().await;
    let creator_id = Some(Uuid::new_v4());

    let original = AcquiredContent::new(
        vec![raw_item("origin-1", "Post", "first version")],
        AcquisitionTier::Direct,
        "browser",
    );
    let edited = AcquiredContent::new(
        vec![raw_item("origin-1", "Post", "edited version")],
        AcquisitionTier::Direct,
        "browser",
    );

    assert_eq!(
        normalizer.persist(creator_id, Platform::Weibo, &original).await.saved,
        1
    );
    let summary = normalizer.persist(creator_id, Platform::Weibo, &edited).await;
    assert_eq!(summary.saved, 0);
    assert_eq!(summary.duplicates, 1);

    // 其他创作者可以使用同一个原生ID
    let other = normalizer
        .persist(Some(Uuid::new_v4()), Platform::Weibo, &edited)
        .await;
    assert_eq!(other.saved, 1);
    assert_eq!(count(&posts).await, 2);
}

/// 指纹全局唯一：不同创作者的相同内容只保留一条
#[tokio::test]
async fn test_fingerprint_is_global() {
    let (_db, posts, normalizer) = normalizer().await;
    let content = AcquiredContent::new(
        vec![raw_item("x", "Same", "identical body")],
        AcquisitionTier::Discovery,
        "bing",
    );

    normalizer
        .persist(Some(Uuid::new_v4()), Platform::Zhihu, &content)
        .await;
    let summary = normalizer
        .persist(Some(Uuid::new_v4()), Platform::Zhihu, &content)
        .await;
    assert_eq!(summary.duplicates, 1);
    assert_eq!(count(&posts).await, 1);
}

/// 批内重复与空条目
#[tokio::test]
async fn test_batch_level_dedup_and_empty_items() {
    let (_db, posts, normalizer) = normalizer().await;
    let content = AcquiredContent::new(
        vec![
            raw_item("1", "Hello", "world"),
            raw_item("2", "  Hello ", " world "),
            raw_item("3", " ", "<p> </p>"),
        ],
        AcquisitionTier::Placeholder,
        "placeholder",
    );

    let summary = normalizer.persist(None, Platform::General, &content).await;
    assert_eq!(summary.saved, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(count(&posts).await, 1);

    let stored = posts
        .query(PostQuery {
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap()
        .0;
    assert_eq!(stored[0].confidence, Confidence::Synthetic);
    assert!(stored[0].creator_id.is_none());
}

/// 存储中无法识别的枚举值按损坏记录报错，而不是静默回退为默认值
#[tokio::test]
async fn test_unknown_stored_status_is_reported_as_corrupt() {
    let (db, posts, normalizer) = normalizer().await;
    let creators = CreatorRepositoryImpl::new(db.db.clone());

    let creator = Creator::new(Platform::Weibo, "https://weibo.com/u/odd", "odd", 60);
    creators.create(&creator).await.unwrap();
    let content = AcquiredContent::new(
        vec![raw_item("c1", "标题", "正文")],
        AcquisitionTier::Direct,
        "http",
    );
    let summary = normalizer
        .persist(Some(creator.id), Platform::Weibo, &content)
        .await;
    assert_eq!(summary.saved, 1);

    db.db
        .execute_unprepared("UPDATE creators SET crawl_status = 'sleeping'")
        .await
        .unwrap();
    db.db
        .execute_unprepared("UPDATE posts SET confidence = 'guessed'")
        .await
        .unwrap();

    let err = creators.find_by_id(creator.id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Corrupt(ref m) if m.contains("sleeping")));

    let err = posts
        .query(PostQuery {
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Corrupt(ref m) if m.contains("guessed")));
}
