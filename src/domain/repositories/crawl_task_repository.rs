// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_task::{CrawlTask, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 存储的数据无法还原为领域对象
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    /// 存储调用超时
    #[error("Store call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// 任务查询参数
#[derive(Debug, Default, Clone)]
pub struct CrawlTaskQuery {
    pub status: Option<TaskStatus>,
    pub creator_id: Option<Uuid>,
    pub limit: u64,
    pub offset: u64,
}

/// 抓取任务仓库特质
#[async_trait]
pub trait CrawlTaskRepository: Send + Sync {
    /// 创建任务
    async fn create(&self, task: &CrawlTask) -> Result<CrawlTask, RepositoryError>;
    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CrawlTask>, RepositoryError>;
    /// 保存任务的当前状态
    async fn update(&self, task: &CrawlTask) -> Result<CrawlTask, RepositoryError>;
    /// 分页查询，按创建时间倒序，返回结果和总数
    async fn query(
        &self,
        params: CrawlTaskQuery,
    ) -> Result<(Vec<CrawlTask>, u64), RepositoryError>;
    /// 将更新时间早于阈值的处理中任务标记为失败
    async fn fail_stale_processing(
        &self,
        older_than: DateTime<Utc>,
        reason: &str,
    ) -> Result<u64, RepositoryError>;
}
