// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_task::TaskStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// 默认分页大小
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// 手动触发请求
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TriggerRequestDto {
    /// 为空时执行一轮发现
    pub creator_id: Option<Uuid>,
}

/// 注册创作者请求
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateCreatorRequestDto {
    #[validate(length(min = 1, max = 32))]
    pub platform: String,
    #[validate(url)]
    pub profile_url: String,
    #[validate(length(min = 1, max = 200))]
    pub display_name: String,
    /// 抓取间隔（分钟）
    #[validate(range(min = 1, max = 43200))]
    pub crawl_interval: Option<i32>,
    pub auto_crawl_enabled: Option<bool>,
}

/// 创建临时任务请求
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateTaskRequestDto {
    #[validate(length(min = 1, max = 32))]
    pub platform: String,
    #[validate(url)]
    pub url: String,
    #[validate(range(min = 1, max = 10))]
    pub max_attempts: Option<i32>,
}

/// 任务状态变更请求
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateTaskStatusRequestDto {
    pub status: TaskStatus,
    #[validate(length(max = 2000))]
    pub error: Option<String>,
}

/// 任务列表查询参数
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct TaskListQueryDto {
    pub status: Option<TaskStatus>,
    pub creator_id: Option<Uuid>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// 内容列表查询参数
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct ContentListQueryDto {
    pub creator_id: Option<Uuid>,
    pub platform: Option<String>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// 创作者列表查询参数
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct CreatorListQueryDto {
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// 分页响应
#[derive(Debug, Serialize, Deserialize)]
pub struct PageDto<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
}

impl<T> PageDto<T> {
    pub fn new(items: Vec<T>, total: u64, limit: u64, offset: u64) -> Self {
        let has_more = offset.saturating_add(items.len() as u64) < total;
        Self {
            items,
            total,
            limit,
            offset,
            has_more,
        }
    }
}
