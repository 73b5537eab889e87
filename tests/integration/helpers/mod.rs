// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use socialcrawl::acquisition::{AcquisitionError, AcquisitionRequest, ContentRouter, FetchStrategy};
use socialcrawl::config::settings::{DatabaseSettings, RetrySettings, Settings};
use socialcrawl::domain::models::creator::Creator;
use socialcrawl::domain::models::platform::Platform;
use socialcrawl::domain::models::raw_item::{AcquiredContent, AcquisitionTier, RawItem};
use socialcrawl::domain::repositories::crawl_task_repository::CrawlTaskRepository;
use socialcrawl::domain::repositories::creator_repository::CreatorRepository;
use socialcrawl::domain::repositories::post_repository::PostRepository;
use socialcrawl::domain::services::content_service::ContentNormalizer;
use socialcrawl::engines::circuit_breaker::CircuitBreaker;
use socialcrawl::engines::router::{FetchRouter, RoutingPolicy};
use socialcrawl::infrastructure::database::connection;
use socialcrawl::infrastructure::repositories::crawl_task_repo_impl::CrawlTaskRepositoryImpl;
use socialcrawl::infrastructure::repositories::creator_repo_impl::CreatorRepositoryImpl;
use socialcrawl::infrastructure::repositories::post_repo_impl::PostRepositoryImpl;
use socialcrawl::presentation::routes::{self, ApiContext};
use socialcrawl::queue::scheduler::{CrawlScheduler, SchedulerConfig};
use socialcrawl::utils::retry_policy::RetryPolicy;
use socialcrawl::workers::crawl_worker::{CrawlWorker, WorkerConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// 基于临时 SQLite 文件的测试数据库
pub struct TestDb {
    pub db: Arc<DatabaseConnection>,
    _dir: TempDir,
}

pub async fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let settings = DatabaseSettings {
        url,
        ..Default::default()
    };

    let db = connection::create_pool(&settings).await.expect("connect sqlite");
    Migrator::up(&db, None).await.expect("migrations");
    TestDb {
        db: Arc::new(db),
        _dir: dir,
    }
}

/// 按脚本返回内容的获取策略，记录调用次数和峰值并发
pub struct ScriptedStrategy {
    items: Vec<RawItem>,
    failures_before_success: usize,
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedStrategy {
    pub fn succeeding(items: Vec<RawItem>) -> Arc<Self> {
        Arc::new(Self::new(items, 0, Duration::ZERO))
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::new(Vec::new(), usize::MAX, Duration::ZERO))
    }

    pub fn failing_times(times: usize, items: Vec<RawItem>) -> Arc<Self> {
        Arc::new(Self::new(items, times, Duration::ZERO))
    }

    pub fn slow(items: Vec<RawItem>, delay: Duration) -> Arc<Self> {
        Arc::new(Self::new(items, 0, delay))
    }

    fn new(items: Vec<RawItem>, failures_before_success: usize, delay: Duration) -> Self {
        Self {
            items,
            failures_before_success,
            delay,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchStrategy for ScriptedStrategy {
    async fn fetch(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<AcquiredContent, AcquisitionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if call < self.failures_before_success {
            return Err(AcquisitionError::Exhausted(format!(
                "scripted failure for {}",
                request.target_url
            )));
        }

        // 每个创作者的内容不同，避免跨创作者的指纹去重
        let items = self
            .items
            .iter()
            .cloned()
            .map(|mut item| {
                item.body = format!("{} ({})", item.body, request.target_url);
                item
            })
            .collect();
        Ok(AcquiredContent::new(items, AcquisitionTier::Direct, "scripted"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn raw_item(origin_id: &str, title: &str, body: &str) -> RawItem {
    RawItem {
        origin_id: Some(origin_id.to_string()),
        title: title.to_string(),
        body: body.to_string(),
        ..Default::default()
    }
}

/// 测试装配参数
pub struct HarnessOptions {
    pub max_concurrent_jobs: usize,
    pub tick_interval: Duration,
    pub stale_crawling_threshold: chrono::Duration,
    pub retry: RetrySettings,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 3,
            tick_interval: Duration::from_secs(3600),
            stale_crawling_threshold: chrono::Duration::minutes(60),
            retry: RetrySettings {
                jitter: 0.0,
                ..Default::default()
            },
        }
    }
}

pub struct Harness {
    pub db: TestDb,
    pub creators: Arc<dyn CreatorRepository>,
    pub tasks: Arc<dyn CrawlTaskRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub worker: Arc<CrawlWorker>,
    pub scheduler: Arc<CrawlScheduler>,
}

impl Harness {
    pub async fn new(strategy: Arc<dyn FetchStrategy>, options: HarnessOptions) -> Self {
        let content_router = Arc::new(ContentRouter::new(strategy));
        Self::with_router(content_router, options).await
    }

    pub async fn with_router(content_router: Arc<ContentRouter>, options: HarnessOptions) -> Self {
        let db = setup_db().await;
        let creators: Arc<dyn CreatorRepository> =
            Arc::new(CreatorRepositoryImpl::new(db.db.clone()));
        let tasks: Arc<dyn CrawlTaskRepository> =
            Arc::new(CrawlTaskRepositoryImpl::new(db.db.clone()));
        let posts: Arc<dyn PostRepository> = Arc::new(PostRepositoryImpl::new(db.db.clone()));

        let store_timeout = Duration::from_secs(5);
        let normalizer = Arc::new(ContentNormalizer::new(posts.clone(), store_timeout));
        let worker = Arc::new(CrawlWorker::new(
            creators.clone(),
            tasks.clone(),
            content_router,
            normalizer,
            WorkerConfig {
                fetch_limit: 20,
                store_timeout,
                job_timeout: Duration::from_secs(10),
                task_max_attempts: options.retry.task_max_attempts,
                retry: RetryPolicy::from_settings(&options.retry),
            },
        ));
        let scheduler = Arc::new(CrawlScheduler::new(
            creators.clone(),
            tasks.clone(),
            worker.clone(),
            SchedulerConfig {
                tick_interval: options.tick_interval,
                max_concurrent_jobs: options.max_concurrent_jobs,
                store_timeout,
                stale_crawling_threshold: options.stale_crawling_threshold,
            },
        ));

        Self {
            db,
            creators,
            tasks,
            posts,
            worker,
            scheduler,
        }
    }

    pub async fn register(&self, platform: Platform, url: &str, name: &str) -> Creator {
        let creator = Creator::new(platform, url, name, 60);
        self.creators.create(&creator).await.expect("create creator")
    }

    pub async fn reload(&self, creator: &Creator) -> Creator {
        self.creators
            .find_by_id(creator.id)
            .await
            .expect("find creator")
            .expect("creator exists")
    }

    /// 把下次抓取时间设置到指定时刻
    pub async fn schedule_at(&self, creator: &Creator, next: DateTime<Utc>) {
        self.creators
            .record_success(creator.id, Utc::now(), next)
            .await
            .expect("record success");
    }

    /// 等待所有已派发作业结束
    pub async fn wait_idle(&self) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.scheduler.in_flight_count() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("jobs did not finish in time");
    }

    pub fn server(&self, settings: Settings) -> TestServer {
        let fetch_router = Arc::new(FetchRouter::new(
            Vec::new(),
            Arc::new(CircuitBreaker::default()),
            RoutingPolicy::default(),
        ));
        let app = routes::routes(ApiContext {
            settings: Arc::new(settings),
            scheduler: self.scheduler.clone(),
            fetch_router,
            creators: self.creators.clone(),
            tasks: self.tasks.clone(),
            posts: self.posts.clone(),
        });
        TestServer::new(app).expect("test server")
    }
}
