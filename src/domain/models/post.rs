// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::platform::Platform;
use super::raw_item::Confidence;

/// 内容记录
///
/// 经规范化和去重后持久化的一条内容。`content_hash` 全局唯一，
/// 同一创作者下非空 `origin_id` 唯一。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub creator_id: Option<Uuid>,
    pub platform: Platform,
    /// 平台原生 ID
    pub origin_id: Option<String>,
    /// 内容指纹
    pub content_hash: String,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub media_urls: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// 可信度
    pub confidence: Confidence,
    /// 产生该内容的层级或后端
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// 内容查询条件
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub creator_id: Option<Uuid>,
    pub platform: Option<Platform>,
    pub limit: u64,
    pub offset: u64,
}
