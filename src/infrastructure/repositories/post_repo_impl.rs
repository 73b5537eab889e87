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

use crate::domain::models::platform::{Platform, UnknownPlatform};
use crate::domain::models::post::{Post, PostQuery};
use crate::domain::models::raw_item::Confidence;
use crate::domain::repositories::crawl_task_repository::RepositoryError;
use crate::domain::repositories::post_repository::{InsertOutcome, PostRepository};
use crate::infrastructure::database::entities::post as post_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, SqlErr,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 内容仓库实现
#[derive(Clone)]
pub struct PostRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl PostRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn filtered(query: &PostQuery) -> Select<post_entity::Entity> {
        let mut select = post_entity::Entity::find();
        if let Some(creator_id) = query.creator_id {
            select = select.filter(post_entity::Column::CreatorId.eq(creator_id));
        }
        if let Some(platform) = query.platform {
            select = select.filter(post_entity::Column::Platform.eq(platform.to_string()));
        }
        select
    }
}

fn string_list(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

impl TryFrom<post_entity::Model> for Post {
    type Error = RepositoryError;

    fn try_from(model: post_entity::Model) -> Result<Self, Self::Error> {
        let platform: Platform = model
            .platform
            .parse()
            .map_err(|e: UnknownPlatform| RepositoryError::Corrupt(e.to_string()))?;
        let confidence: Confidence = model.confidence.parse().map_err(|_| {
            RepositoryError::Corrupt(format!("unknown confidence: {}", model.confidence))
        })?;

        Ok(Self {
            id: model.id,
            creator_id: model.creator_id,
            platform,
            origin_id: model.origin_id,
            content_hash: model.content_hash,
            title: model.title,
            body: model.body,
            author: model.author,
            url: model.url,
            tags: string_list(model.tags),
            media_urls: string_list(model.media_urls),
            published_at: model.published_at.map(|t| t.with_timezone(&Utc)),
            confidence,
            source: model.source,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

impl From<&Post> for post_entity::ActiveModel {
    fn from(post: &Post) -> Self {
        Self {
            id: Set(post.id),
            creator_id: Set(post.creator_id),
            platform: Set(post.platform.to_string()),
            origin_id: Set(post.origin_id.clone()),
            content_hash: Set(post.content_hash.clone()),
            title: Set(post.title.clone()),
            body: Set(post.body.clone()),
            author: Set(post.author.clone()),
            url: Set(post.url.clone()),
            tags: Set(serde_json::json!(post.tags)),
            media_urls: Set(serde_json::json!(post.media_urls)),
            published_at: Set(post.published_at.map(|t| t.fixed_offset())),
            confidence: Set(post.confidence.to_string()),
            source: Set(post.source.clone()),
            created_at: Set(post.created_at.fixed_offset()),
        }
    }
}

#[async_trait]
impl PostRepository for PostRepositoryImpl {
    async fn exists_by_hash(&self, content_hash: &str) -> Result<bool, RepositoryError> {
        let count = post_entity::Entity::find()
            .filter(post_entity::Column::ContentHash.eq(content_hash))
            .count(self.db.as_ref())
            .await?;
        Ok(count > 0)
    }

    async fn exists_by_origin(
        &self,
        creator_id: Option<Uuid>,
        origin_id: &str,
    ) -> Result<bool, RepositoryError> {
        let creator_filter = match creator_id {
            Some(id) => post_entity::Column::CreatorId.eq(id),
            None => post_entity::Column::CreatorId.is_null(),
        };

        let count = post_entity::Entity::find()
            .filter(creator_filter)
            .filter(post_entity::Column::OriginId.eq(origin_id))
            .count(self.db.as_ref())
            .await?;
        Ok(count > 0)
    }

    async fn insert(&self, post: &Post) -> Result<InsertOutcome, RepositoryError> {
        let model: post_entity::ActiveModel = post.into();

        match model.insert(self.db.as_ref()).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(detail)) => {
                    debug!(content_hash = %post.content_hash, %detail, "Unique violation, treating as duplicate");
                    Ok(InsertOutcome::Duplicate)
                }
                _ => Err(err.into()),
            },
        }
    }

    async fn query(&self, query: PostQuery) -> Result<(Vec<Post>, u64), RepositoryError> {
        let total = Self::filtered(&query).count(self.db.as_ref()).await?;

        let posts = Self::filtered(&query)
            .order_by_desc(post_entity::Column::CreatedAt)
            .order_by_asc(post_entity::Column::Id)
            .limit(query.limit)
            .offset(query.offset)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((posts, total))
    }
}
