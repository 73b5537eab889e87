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

use crate::domain::models::platform::Platform;
use crate::domain::models::post::Post;
use crate::domain::models::raw_item::{AcquiredContent, RawItem};
use crate::domain::repositories::crawl_task_repository::RepositoryError;
use crate::domain::repositories::post_repository::{InsertOutcome, PostRepository};
use crate::utils::text_processing::{clean_html_text, collapse_whitespace, truncate_chars};
use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// 标题最大字符数
pub const MAX_TITLE_CHARS: usize = 200;
/// 标题为空时从正文截取的字符数
const DERIVED_TITLE_CHARS: usize = 60;

/// 一批内容的持久化结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistSummary {
    /// 新写入的条数
    pub saved: usize,
    /// 因指纹或原生ID重复而跳过的条数
    pub duplicates: usize,
    /// 写入失败的条数
    pub failed: usize,
}

impl PersistSummary {
    pub fn total(&self) -> usize {
        self.saved + self.duplicates + self.failed
    }
}

/// 规范化后的条目
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub origin_id: Option<String>,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub media_urls: Vec<String>,
    pub published_at: Option<chrono::DateTime<Utc>>,
    pub content_hash: String,
}

/// 内容指纹：`title + "\n" + body` 的 SHA-256 十六进制
pub fn fingerprint(title: &str, body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\n");
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

fn dedup_preserving_order(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|v| collapse_whitespace(v))
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(collapse_whitespace)
        .filter(|v| !v.is_empty())
}

/// 规范化原始条目
///
/// 标题与正文都为空时返回 `None`；标题为空时取正文开头作为标题
pub fn normalize(item: &RawItem) -> Option<NormalizedItem> {
    let body = clean_html_text(&item.body);
    let mut title = truncate_chars(&clean_html_text(&item.title), MAX_TITLE_CHARS);

    if title.is_empty() && body.is_empty() {
        return None;
    }
    if title.is_empty() {
        title = truncate_chars(&body, DERIVED_TITLE_CHARS);
    }

    let content_hash = fingerprint(&title, &body);

    Some(NormalizedItem {
        origin_id: non_empty(item.origin_id.as_deref()),
        title,
        body,
        author: non_empty(item.author.as_deref()),
        url: item
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
        tags: dedup_preserving_order(&item.tags),
        media_urls: dedup_preserving_order(&item.media_urls),
        published_at: item.published_at,
        content_hash,
    })
}

/// 内容规范化与去重服务
///
/// 写入前检查指纹与 `(creator_id, origin_id)`，并依赖唯一索引兜底，
/// 因此同一批内容重复提交不会产生新记录
pub struct ContentNormalizer {
    posts: Arc<dyn PostRepository>,
    store_timeout: Duration,
}

impl ContentNormalizer {
    pub fn new(posts: Arc<dyn PostRepository>, store_timeout: Duration) -> Self {
        Self {
            posts,
            store_timeout,
        }
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| RepositoryError::Timeout(self.store_timeout))?
    }

    async fn is_duplicate(
        &self,
        creator_id: Option<Uuid>,
        item: &NormalizedItem,
    ) -> Result<bool, RepositoryError> {
        if self.timed(self.posts.exists_by_hash(&item.content_hash)).await? {
            return Ok(true);
        }
        if let Some(origin_id) = &item.origin_id {
            return self
                .timed(self.posts.exists_by_origin(creator_id, origin_id))
                .await;
        }
        Ok(false)
    }

    /// 规范化并写入一批内容
    ///
    /// 单条失败只记录日志并计数，不会中断整批
    pub async fn persist(
        &self,
        creator_id: Option<Uuid>,
        platform: Platform,
        content: &AcquiredContent,
    ) -> PersistSummary {
        let mut summary = PersistSummary::default();
        let mut batch_hashes = HashSet::new();
        let mut batch_origins = HashSet::new();
        let confidence = content.confidence();

        for raw in &content.items {
            let Some(item) = normalize(raw) else {
                debug!("Dropping item with empty title and body");
                continue;
            };

            let repeated_in_batch = !batch_hashes.insert(item.content_hash.clone())
                || item
                    .origin_id
                    .as_ref()
                    .is_some_and(|o| !batch_origins.insert(o.clone()));
            if repeated_in_batch {
                summary.duplicates += 1;
                continue;
            }

            match self.is_duplicate(creator_id, &item).await {
                Ok(true) => {
                    summary.duplicates += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(content_hash = %item.content_hash, error = %e, "Duplicate check failed");
                    summary.failed += 1;
                    continue;
                }
            }

            let post = Post {
                id: Uuid::new_v4(),
                creator_id,
                platform,
                origin_id: item.origin_id,
                content_hash: item.content_hash,
                title: item.title,
                body: item.body,
                author: item.author,
                url: item.url,
                tags: item.tags,
                media_urls: item.media_urls,
                published_at: item.published_at,
                confidence,
                source: content.source.clone(),
                created_at: Utc::now(),
            };

            match self.timed(self.posts.insert(&post)).await {
                Ok(InsertOutcome::Inserted) => summary.saved += 1,
                Ok(InsertOutcome::Duplicate) => summary.duplicates += 1,
                Err(e) => {
                    warn!(content_hash = %post.content_hash, error = %e, "Failed to insert post");
                    summary.failed += 1;
                }
            }
        }

        counter!("posts_saved_total").increment(summary.saved as u64);
        counter!("posts_duplicate_total").increment(summary.duplicates as u64);
        debug!(
            saved = summary.saved,
            duplicates = summary.duplicates,
            failed = summary.failed,
            "Batch persisted"
        );
        summary
    }
}
