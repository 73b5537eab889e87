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

use crate::domain::models::creator::{CrawlStatus, Creator};
use crate::domain::models::platform::Platform;
use crate::domain::repositories::crawl_task_repository::RepositoryError;
use crate::domain::repositories::creator_repository::{CrawlFailure, CreatorRepository};
use crate::infrastructure::database::entities::creator as creator_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::{Expr, NullOrdering, Order},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 创作者仓库实现
///
/// 基于SeaORM实现，抓取权通过条件更新的影响行数判定
#[derive(Clone)]
pub struct CreatorRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl CreatorRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn to_utc(value: DateTime<FixedOffset>) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn to_db(value: DateTime<Utc>) -> DateTime<FixedOffset> {
    value.fixed_offset()
}

impl TryFrom<creator_entity::Model> for Creator {
    type Error = RepositoryError;

    fn try_from(model: creator_entity::Model) -> Result<Self, Self::Error> {
        let platform: Platform = model
            .platform
            .parse()
            .map_err(|e: crate::domain::models::platform::UnknownPlatform| {
                RepositoryError::Corrupt(e.to_string())
            })?;
        let crawl_status: CrawlStatus = model.crawl_status.parse().map_err(|_| {
            RepositoryError::Corrupt(format!("unknown crawl status: {}", model.crawl_status))
        })?;

        Ok(Self {
            id: model.id,
            platform,
            profile_url: model.profile_url,
            display_name: model.display_name,
            auto_crawl_enabled: model.auto_crawl_enabled,
            crawl_interval: model.crawl_interval,
            crawl_status,
            last_crawl_at: model.last_crawl_at.map(to_utc),
            next_crawl_at: model.next_crawl_at.map(to_utc),
            crawl_error: model.crawl_error,
            consecutive_failures: model.consecutive_failures,
            created_at: to_utc(model.created_at),
            updated_at: to_utc(model.updated_at),
        })
    }
}

impl From<&Creator> for creator_entity::ActiveModel {
    fn from(creator: &Creator) -> Self {
        Self {
            id: Set(creator.id),
            platform: Set(creator.platform.to_string()),
            profile_url: Set(creator.profile_url.clone()),
            display_name: Set(creator.display_name.clone()),
            auto_crawl_enabled: Set(creator.auto_crawl_enabled),
            crawl_interval: Set(creator.crawl_interval),
            crawl_status: Set(creator.crawl_status.to_string()),
            last_crawl_at: Set(creator.last_crawl_at.map(to_db)),
            next_crawl_at: Set(creator.next_crawl_at.map(to_db)),
            crawl_error: Set(creator.crawl_error.clone()),
            consecutive_failures: Set(creator.consecutive_failures),
            created_at: Set(to_db(creator.created_at)),
            updated_at: Set(to_db(creator.updated_at)),
        }
    }
}

#[async_trait]
impl CreatorRepository for CreatorRepositoryImpl {
    async fn create(&self, creator: &Creator) -> Result<Creator, RepositoryError> {
        let model: creator_entity::ActiveModel = creator.into();
        let inserted = model.insert(self.db.as_ref()).await?;
        inserted.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Creator>, RepositoryError> {
        creator_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(Creator::try_from)
            .transpose()
    }

    async fn list(&self, limit: u64, offset: u64) -> Result<Vec<Creator>, RepositoryError> {
        creator_entity::Entity::find()
            .order_by_asc(creator_entity::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Creator::try_from)
            .collect()
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Creator>, RepositoryError> {
        creator_entity::Entity::find()
            .filter(creator_entity::Column::AutoCrawlEnabled.eq(true))
            .filter(creator_entity::Column::CrawlStatus.is_not_in([
                CrawlStatus::Crawling.to_string(),
                CrawlStatus::NeedsAttention.to_string(),
            ]))
            .filter(
                Condition::any()
                    .add(creator_entity::Column::NextCrawlAt.is_null())
                    .add(creator_entity::Column::NextCrawlAt.lte(to_db(now))),
            )
            .order_by_with_nulls(
                creator_entity::Column::NextCrawlAt,
                Order::Asc,
                NullOrdering::First,
            )
            .order_by_asc(creator_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Creator::try_from)
            .collect()
    }

    async fn try_mark_crawling(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = creator_entity::Entity::update_many()
            .col_expr(
                creator_entity::Column::CrawlStatus,
                Expr::value(CrawlStatus::Crawling.to_string()),
            )
            .col_expr(
                creator_entity::Column::UpdatedAt,
                Expr::value(to_db(Utc::now())),
            )
            .filter(creator_entity::Column::Id.eq(id))
            .filter(creator_entity::Column::CrawlStatus.ne(CrawlStatus::Crawling.to_string()))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn record_success(
        &self,
        id: Uuid,
        finished_at: DateTime<Utc>,
        next_crawl_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = creator_entity::Entity::update_many()
            .col_expr(
                creator_entity::Column::CrawlStatus,
                Expr::value(CrawlStatus::Idle.to_string()),
            )
            .col_expr(
                creator_entity::Column::LastCrawlAt,
                Expr::value(Some(to_db(finished_at))),
            )
            .col_expr(
                creator_entity::Column::NextCrawlAt,
                Expr::value(Some(to_db(next_crawl_at))),
            )
            .col_expr(
                creator_entity::Column::CrawlError,
                Expr::value(Option::<String>::None),
            )
            .col_expr(creator_entity::Column::ConsecutiveFailures, Expr::value(0))
            .col_expr(
                creator_entity::Column::UpdatedAt,
                Expr::value(to_db(Utc::now())),
            )
            .filter(creator_entity::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn record_failure(
        &self,
        id: Uuid,
        failure: CrawlFailure,
    ) -> Result<(), RepositoryError> {
        let mut update = creator_entity::Entity::update_many()
            .col_expr(
                creator_entity::Column::CrawlStatus,
                Expr::value(failure.status.to_string()),
            )
            .col_expr(
                creator_entity::Column::CrawlError,
                Expr::value(Some(failure.error)),
            )
            .col_expr(
                creator_entity::Column::ConsecutiveFailures,
                Expr::value(failure.consecutive_failures),
            )
            .col_expr(
                creator_entity::Column::UpdatedAt,
                Expr::value(to_db(Utc::now())),
            );

        if let Some(next) = failure.next_crawl_at {
            update = update.col_expr(
                creator_entity::Column::NextCrawlAt,
                Expr::value(Some(to_db(next))),
            );
        }

        let result = update
            .filter(creator_entity::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn reset_for_retry(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = creator_entity::Entity::update_many()
            .col_expr(
                creator_entity::Column::CrawlStatus,
                Expr::value(CrawlStatus::Idle.to_string()),
            )
            .col_expr(creator_entity::Column::ConsecutiveFailures, Expr::value(0))
            .col_expr(
                creator_entity::Column::NextCrawlAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .col_expr(
                creator_entity::Column::UpdatedAt,
                Expr::value(to_db(Utc::now())),
            )
            .filter(creator_entity::Column::Id.eq(id))
            .filter(creator_entity::Column::CrawlStatus.is_in([
                CrawlStatus::NeedsAttention.to_string(),
                CrawlStatus::Failed.to_string(),
            ]))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn reset_stale_crawling(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = creator_entity::Entity::update_many()
            .col_expr(
                creator_entity::Column::CrawlStatus,
                Expr::value(CrawlStatus::Idle.to_string()),
            )
            .col_expr(
                creator_entity::Column::UpdatedAt,
                Expr::value(to_db(Utc::now())),
            )
            .filter(creator_entity::Column::CrawlStatus.eq(CrawlStatus::Crawling.to_string()))
            .filter(creator_entity::Column::UpdatedAt.lt(to_db(older_than)))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }

    async fn count_by_status(&self) -> Result<HashMap<CrawlStatus, u64>, RepositoryError> {
        let rows: Vec<(String, i64)> = creator_entity::Entity::find()
            .select_only()
            .column(creator_entity::Column::CrawlStatus)
            .column_as(creator_entity::Column::Id.count(), "count")
            .group_by(creator_entity::Column::CrawlStatus)
            .into_tuple()
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(status, count)| {
                status
                    .parse::<CrawlStatus>()
                    .ok()
                    .map(|s| (s, count.max(0) as u64))
            })
            .collect())
    }
}
