// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use socialcrawl::acquisition::build_content_router;
use socialcrawl::config::settings::Settings;
use socialcrawl::domain::repositories::crawl_task_repository::CrawlTaskRepository;
use socialcrawl::domain::repositories::creator_repository::CreatorRepository;
use socialcrawl::domain::repositories::post_repository::PostRepository;
use socialcrawl::domain::services::content_service::ContentNormalizer;
use socialcrawl::engines::build_fetch_router;
use socialcrawl::infrastructure::database::connection;
use socialcrawl::infrastructure::metrics;
use socialcrawl::infrastructure::repositories::crawl_task_repo_impl::CrawlTaskRepositoryImpl;
use socialcrawl::infrastructure::repositories::creator_repo_impl::CreatorRepositoryImpl;
use socialcrawl::infrastructure::repositories::post_repo_impl::PostRepositoryImpl;
use socialcrawl::infrastructure::search::build_search_engines;
use socialcrawl::presentation::routes::{self, ApiContext};
use socialcrawl::queue::scheduler::{CrawlScheduler, SchedulerConfig};
use socialcrawl::utils::telemetry;
use socialcrawl::workers::crawl_worker::{CrawlWorker, WorkerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration and observability
    let settings = Arc::new(Settings::new()?);
    telemetry::init_telemetry(&settings.logging);
    info!("Starting socialcrawl...");
    metrics::init_metrics(&settings.metrics);

    // 2. Database
    let db = Arc::new(connection::create_pool(&settings.database).await?);
    info!("Database connection established");
    if settings.database.run_migrations {
        connection::run_migrations(db.as_ref()).await?;
    }

    // 3. Fetch backends and acquisition chain
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    let fetch_router = Arc::new(build_fetch_router(&settings.fetch, client.clone()));
    let search_engines = build_search_engines(&settings.discovery, client.clone());
    let content_router = Arc::new(build_content_router(
        &settings,
        client,
        fetch_router.clone(),
        search_engines,
    ));

    // 4. Repositories and normalizer
    let creators: Arc<dyn CreatorRepository> = Arc::new(CreatorRepositoryImpl::new(db.clone()));
    let tasks: Arc<dyn CrawlTaskRepository> = Arc::new(CrawlTaskRepositoryImpl::new(db.clone()));
    let posts: Arc<dyn PostRepository> = Arc::new(PostRepositoryImpl::new(db.clone()));
    let normalizer = Arc::new(ContentNormalizer::new(
        posts.clone(),
        settings.scheduler.store_timeout(),
    ));

    // 5. Worker and scheduler
    let worker = Arc::new(CrawlWorker::new(
        creators.clone(),
        tasks.clone(),
        content_router,
        normalizer,
        WorkerConfig::from_settings(&settings.scheduler, &settings.retry),
    ));
    let scheduler = Arc::new(CrawlScheduler::new(
        creators.clone(),
        tasks.clone(),
        worker,
        SchedulerConfig::from_settings(&settings.scheduler),
    ));
    if settings.scheduler.enabled {
        let reconciled = scheduler.start().await?;
        info!(
            creators_reset = reconciled.creators_reset,
            tasks_failed = reconciled.tasks_failed,
            "Scheduler running"
        );
    } else {
        info!("Scheduler disabled by configuration, manual triggers only");
    }

    // 6. HTTP server
    let app = routes::routes(ApiContext {
        settings: settings.clone(),
        scheduler: scheduler.clone(),
        fetch_router,
        creators,
        tasks,
        posts,
    });

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    scheduler.stop().await;
    if let Err(e) = &served {
        error!(error = %e, "Server terminated with error");
    }
    served?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
