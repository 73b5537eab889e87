// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    body::Bytes,
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    application::dto::crawler_request::{
        ContentListQueryDto, CreateTaskRequestDto, PageDto, TaskListQueryDto,
        TriggerRequestDto, UpdateTaskStatusRequestDto, DEFAULT_PAGE_SIZE,
    },
    config::settings::Settings,
    domain::{
        models::{crawl_task::CrawlTask, platform::Platform, post::PostQuery},
        repositories::{
            crawl_task_repository::{CrawlTaskQuery, CrawlTaskRepository},
            post_repository::PostRepository,
        },
    },
    engines::router::FetchRouter,
    presentation::errors::{AppError, RequestError},
    queue::scheduler::CrawlScheduler,
};

/// 手动触发抓取
///
/// 请求体可为空；带 `creator_id` 时同步执行该创作者的作业并返回结果
pub async fn trigger(
    Extension(scheduler): Extension<Arc<CrawlScheduler>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: TriggerRequestDto = if body.iter().all(u8::is_ascii_whitespace) {
        TriggerRequestDto::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| RequestError::BadRequest(format!("invalid request body: {}", e)))?
    };

    info!(creator_id = ?request.creator_id, "Manual crawl trigger");
    let outcome = scheduler.trigger(request.creator_id).await?;
    Ok(Json(outcome))
}

/// 调度器与后端状态
pub async fn status(
    Extension(scheduler): Extension<Arc<CrawlScheduler>>,
    Extension(fetch_router): Extension<Arc<FetchRouter>>,
    Extension(settings): Extension<Arc<Settings>>,
) -> Result<impl IntoResponse, AppError> {
    let scheduler_status = scheduler.status().await?;

    Ok(Json(json!({
        "scheduler": scheduler_status,
        "backends": fetch_router.stats(),
        "config": {
            "fetch_limit": settings.scheduler.fetch_limit,
            "job_timeout_secs": settings.scheduler.job_timeout_secs,
            "failure_backoff_enabled": settings.retry.failure_backoff_enabled,
            "max_consecutive_failures": settings.retry.max_consecutive_failures,
            "fallback_enabled": settings.fetch.fallback_enabled,
            "discovery_enabled": settings.discovery.enabled,
            "placeholder_enabled": settings.placeholder.enabled,
        },
    })))
}

/// 分页查询抓取任务
pub async fn list_tasks(
    Extension(tasks): Extension<Arc<dyn CrawlTaskRepository>>,
    Query(query): Query<TaskListQueryDto>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let (items, total) = tasks
        .query(CrawlTaskQuery {
            status: query.status,
            creator_id: query.creator_id,
            limit,
            offset,
        })
        .await?;

    Ok(Json(PageDto::new(items, total, limit, offset)))
}

/// 创建临时抓取任务并在后台执行
pub async fn create_task(
    Extension(tasks): Extension<Arc<dyn CrawlTaskRepository>>,
    Extension(scheduler): Extension<Arc<CrawlScheduler>>,
    Extension(settings): Extension<Arc<Settings>>,
    Json(payload): Json<CreateTaskRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let platform: Platform = payload.platform.parse()?;
    let max_attempts = payload
        .max_attempts
        .unwrap_or(settings.retry.task_max_attempts);

    let task = CrawlTask::new(None, platform, payload.url, max_attempts);
    let task = tasks.create(&task).await?;
    info!(task_id = %task.id, %platform, "Ad-hoc crawl task accepted");

    scheduler.spawn_task(task.clone());
    Ok((StatusCode::ACCEPTED, Json(task)))
}

/// 查询单个任务
pub async fn get_task(
    Extension(tasks): Extension<Arc<dyn CrawlTaskRepository>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let task = tasks
        .find_by_id(id)
        .await?
        .ok_or_else(|| RequestError::NotFound(format!("task {} not found", id)))?;
    Ok(Json(task))
}

/// 人工变更任务状态
///
/// 只允许状态机定义的转换，非法转换返回 409
pub async fn update_task_status(
    Extension(tasks): Extension<Arc<dyn CrawlTaskRepository>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskStatusRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let task = tasks
        .find_by_id(id)
        .await?
        .ok_or_else(|| RequestError::NotFound(format!("task {} not found", id)))?;

    let from = task.status;
    let updated = task.transition(payload.status, payload.error)?;
    let updated = tasks.update(&updated).await?;
    info!(task_id = %id, %from, to = %updated.status, "Task status changed manually");

    Ok(Json(updated))
}

/// 分页查询已入库内容
pub async fn list_contents(
    Extension(posts): Extension<Arc<dyn PostRepository>>,
    Query(query): Query<ContentListQueryDto>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let platform = query
        .platform
        .as_deref()
        .map(str::parse::<Platform>)
        .transpose()?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let (items, total) = posts
        .query(PostQuery {
            creator_id: query.creator_id,
            platform,
            limit,
            offset,
        })
        .await?;

    Ok(Json(PageDto::new(items, total, limit, offset)))
}
