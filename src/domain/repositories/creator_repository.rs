// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::creator::{CrawlStatus, Creator};
use crate::domain::repositories::crawl_task_repository::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// 一次失败作业要写回的创作者状态
#[derive(Debug, Clone)]
pub struct CrawlFailure {
    /// Failed 或 NeedsAttention
    pub status: CrawlStatus,
    pub error: String,
    pub consecutive_failures: i32,
    /// 为空时保持原有的 next_crawl_at 不变
    pub next_crawl_at: Option<DateTime<Utc>>,
}

/// 创作者仓库特质
///
/// 除 `create` 外，所有写操作都只由调度器调用
#[async_trait]
pub trait CreatorRepository: Send + Sync {
    /// 注册创作者
    async fn create(&self, creator: &Creator) -> Result<Creator, RepositoryError>;
    /// 根据ID查找创作者
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Creator>, RepositoryError>;
    /// 分页列出创作者
    async fn list(&self, limit: u64, offset: u64) -> Result<Vec<Creator>, RepositoryError>;
    /// 查询到期需要抓取的创作者，按 next_crawl_at 升序（未设置的排最前）
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Creator>, RepositoryError>;
    /// 条件更新为 crawling
    ///
    /// 仅当当前状态不是 crawling 时生效，返回是否取得该创作者的抓取权
    async fn try_mark_crawling(&self, id: Uuid) -> Result<bool, RepositoryError>;
    /// 记录成功的抓取
    async fn record_success(
        &self,
        id: Uuid,
        finished_at: DateTime<Utc>,
        next_crawl_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    /// 记录失败的抓取
    async fn record_failure(&self, id: Uuid, failure: CrawlFailure)
        -> Result<(), RepositoryError>;
    /// 人工恢复：needs_attention/failed → idle，清零失败计数并立即可抓
    async fn reset_for_retry(&self, id: Uuid) -> Result<bool, RepositoryError>;
    /// 将更新时间早于阈值的 crawling 创作者重置为 idle
    async fn reset_stale_crawling(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;
    /// 各状态下的创作者数量
    async fn count_by_status(&self) -> Result<HashMap<CrawlStatus, u64>, RepositoryError>;
}
