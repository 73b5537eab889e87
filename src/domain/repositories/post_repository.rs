// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::post::{Post, PostQuery};
use crate::domain::repositories::crawl_task_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 插入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// 新记录已写入
    Inserted,
    /// 唯一约束冲突，视为重复
    Duplicate,
}

/// 内容仓库特质
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// 指纹是否已存在
    async fn exists_by_hash(&self, content_hash: &str) -> Result<bool, RepositoryError>;
    /// 同一创作者下平台原生ID是否已存在
    async fn exists_by_origin(
        &self,
        creator_id: Option<Uuid>,
        origin_id: &str,
    ) -> Result<bool, RepositoryError>;
    /// 插入内容，唯一约束冲突返回 `InsertOutcome::Duplicate`
    async fn insert(&self, post: &Post) -> Result<InsertOutcome, RepositoryError>;
    /// 分页查询，按创建时间倒序，返回结果和总数
    async fn query(&self, query: PostQuery) -> Result<(Vec<Post>, u64), RepositoryError>;
}
