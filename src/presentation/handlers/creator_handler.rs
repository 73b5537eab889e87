// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::application::dto::crawler_request::{
    CreateCreatorRequestDto, CreatorListQueryDto, PageDto, DEFAULT_PAGE_SIZE,
};
use crate::domain::models::creator::Creator;
use crate::domain::models::platform::Platform;
use crate::domain::repositories::creator_repository::CreatorRepository;
use crate::presentation::errors::AppError;

/// 默认抓取间隔（分钟）
const DEFAULT_CRAWL_INTERVAL: i32 = 60;

/// 注册创作者
pub async fn create_creator(
    Extension(creators): Extension<Arc<dyn CreatorRepository>>,
    Json(payload): Json<CreateCreatorRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let platform: Platform = payload.platform.parse()?;

    let mut creator = Creator::new(
        platform,
        payload.profile_url.trim(),
        payload.display_name.trim(),
        payload.crawl_interval.unwrap_or(DEFAULT_CRAWL_INTERVAL),
    );
    if let Some(enabled) = payload.auto_crawl_enabled {
        creator.auto_crawl_enabled = enabled;
    }

    let creator = creators.create(&creator).await?;
    info!(creator_id = %creator.id, %platform, "Creator registered");
    Ok((StatusCode::CREATED, Json(creator)))
}

/// 分页列出创作者
pub async fn list_creators(
    Extension(creators): Extension<Arc<dyn CreatorRepository>>,
    Query(query): Query<CreatorListQueryDto>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let (items, counts) =
        futures::try_join!(creators.list(limit, offset), creators.count_by_status())?;
    let total = counts.values().sum();

    Ok(Json(PageDto::new(items, total, limit, offset)))
}
