// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::repositories::crawl_task_repository::CrawlTaskRepository;
use crate::domain::repositories::creator_repository::CreatorRepository;
use crate::domain::repositories::post_repository::PostRepository;
use crate::engines::router::FetchRouter;
use crate::presentation::handlers::{crawler_handler, creator_handler};
use crate::queue::scheduler::CrawlScheduler;
use axum::{
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// 路由依赖的共享组件
#[derive(Clone)]
pub struct ApiContext {
    pub settings: Arc<Settings>,
    pub scheduler: Arc<CrawlScheduler>,
    pub fetch_router: Arc<FetchRouter>,
    pub creators: Arc<dyn CreatorRepository>,
    pub tasks: Arc<dyn CrawlTaskRepository>,
    pub posts: Arc<dyn PostRepository>,
}

/// 创建应用路由
pub fn routes(ctx: ApiContext) -> Router {
    let crawler_routes = Router::new()
        .route("/crawler/trigger", post(crawler_handler::trigger))
        .route("/crawler/status", get(crawler_handler::status))
        .route(
            "/crawler/tasks",
            get(crawler_handler::list_tasks).post(crawler_handler::create_task),
        )
        .route("/crawler/tasks/{id}", get(crawler_handler::get_task))
        .route(
            "/crawler/tasks/{id}/status",
            put(crawler_handler::update_task_status),
        )
        .route("/crawler/contents", get(crawler_handler::list_contents))
        .route(
            "/crawler/creators",
            get(creator_handler::list_creators).post(creator_handler::create_creator),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version))
        .merge(crawler_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(ctx.settings))
                .layer(Extension(ctx.scheduler))
                .layer(Extension(ctx.fetch_router))
                .layer(Extension(ctx.creators))
                .layer(Extension(ctx.tasks))
                .layer(Extension(ctx.posts)),
        )
}

/// 健康检查端点
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
