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

use crate::domain::models::crawl_task::{CrawlTask, TaskResult, TaskStatus};
use crate::domain::models::platform::{Platform, UnknownPlatform};
use crate::domain::repositories::crawl_task_repository::{
    CrawlTaskQuery, CrawlTaskRepository, RepositoryError,
};
use crate::infrastructure::database::entities::crawl_task as task_entity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 抓取任务仓库实现
#[derive(Clone)]
pub struct CrawlTaskRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl CrawlTaskRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn filtered(params: &CrawlTaskQuery) -> Select<task_entity::Entity> {
        let mut select = task_entity::Entity::find();
        if let Some(status) = params.status {
            select = select.filter(task_entity::Column::Status.eq(status.to_string()));
        }
        if let Some(creator_id) = params.creator_id {
            select = select.filter(task_entity::Column::CreatorId.eq(creator_id));
        }
        select
    }
}

impl TryFrom<task_entity::Model> for CrawlTask {
    type Error = RepositoryError;

    fn try_from(model: task_entity::Model) -> Result<Self, Self::Error> {
        let platform: Platform = model
            .platform
            .parse()
            .map_err(|e: UnknownPlatform| RepositoryError::Corrupt(e.to_string()))?;
        let status: TaskStatus = model.status.parse().map_err(|_| {
            RepositoryError::Corrupt(format!("unknown task status: {}", model.status))
        })?;
        let result = model
            .result
            .and_then(|value| serde_json::from_value::<TaskResult>(value).ok());

        Ok(Self {
            id: model.id,
            creator_id: model.creator_id,
            platform,
            target_url: model.target_url,
            status,
            attempt_count: model.attempt_count,
            max_attempts: model.max_attempts,
            error_message: model.error_message,
            result,
            created_at: model.created_at.with_timezone(&Utc),
            started_at: model.started_at.map(|t| t.with_timezone(&Utc)),
            completed_at: model.completed_at.map(|t| t.with_timezone(&Utc)),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

impl From<&CrawlTask> for task_entity::ActiveModel {
    fn from(task: &CrawlTask) -> Self {
        Self {
            id: Set(task.id),
            creator_id: Set(task.creator_id),
            platform: Set(task.platform.to_string()),
            target_url: Set(task.target_url.clone()),
            status: Set(task.status.to_string()),
            attempt_count: Set(task.attempt_count),
            max_attempts: Set(task.max_attempts),
            error_message: Set(task.error_message.clone()),
            result: Set(task
                .result
                .as_ref()
                .and_then(|r| serde_json::to_value(r).ok())),
            created_at: Set(task.created_at.fixed_offset()),
            started_at: Set(task.started_at.map(|t| t.fixed_offset())),
            completed_at: Set(task.completed_at.map(|t| t.fixed_offset())),
            updated_at: Set(task.updated_at.fixed_offset()),
        }
    }
}

#[async_trait]
impl CrawlTaskRepository for CrawlTaskRepositoryImpl {
    async fn create(&self, task: &CrawlTask) -> Result<CrawlTask, RepositoryError> {
        let model: task_entity::ActiveModel = task.into();
        model.insert(self.db.as_ref()).await?;
        Ok(task.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CrawlTask>, RepositoryError> {
        task_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(CrawlTask::try_from)
            .transpose()
    }

    async fn update(&self, task: &CrawlTask) -> Result<CrawlTask, RepositoryError> {
        let mut model: task_entity::ActiveModel = task.into();
        // created_at is immutable
        model.created_at = sea_orm::ActiveValue::NotSet;

        match model.update(self.db.as_ref()).await {
            Ok(updated) => updated.try_into(),
            Err(sea_orm::DbErr::RecordNotUpdated) => Err(RepositoryError::NotFound),
            Err(err) => Err(err.into()),
        }
    }

    async fn query(
        &self,
        params: CrawlTaskQuery,
    ) -> Result<(Vec<CrawlTask>, u64), RepositoryError> {
        let total = Self::filtered(&params).count(self.db.as_ref()).await?;

        let tasks = Self::filtered(&params)
            .order_by_desc(task_entity::Column::CreatedAt)
            .order_by_asc(task_entity::Column::Id)
            .limit(params.limit)
            .offset(params.offset)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(CrawlTask::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((tasks, total))
    }

    async fn fail_stale_processing(
        &self,
        older_than: DateTime<Utc>,
        reason: &str,
    ) -> Result<u64, RepositoryError> {
        let now = Utc::now().fixed_offset();
        let result = task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::Status,
                Expr::value(TaskStatus::Failed.to_string()),
            )
            .col_expr(
                task_entity::Column::ErrorMessage,
                Expr::value(Some(reason.to_string())),
            )
            .col_expr(task_entity::Column::CompletedAt, Expr::value(Some(now)))
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(now))
            .filter(task_entity::Column::Status.eq(TaskStatus::Processing.to_string()))
            .filter(task_entity::Column::UpdatedAt.lt(older_than.fixed_offset()))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}
