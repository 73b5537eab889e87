// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::platform::Platform;

/// 创作者实体
///
/// 表示一个被持续关注的社交媒体账号。调度器根据 `auto_crawl_enabled`、
/// `crawl_status` 与 `next_crawl_at` 决定何时为其派发抓取作业，
/// 并在每次作业前后更新这些字段。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    /// 创作者唯一标识符
    pub id: Uuid,
    /// 所在平台
    pub platform: Platform,
    /// 主页地址
    pub profile_url: String,
    /// 显示名称，同时作为搜索发现的关键词
    pub display_name: String,
    /// 是否参与自动抓取
    pub auto_crawl_enabled: bool,
    /// 抓取间隔（分钟）
    pub crawl_interval: i32,
    /// 抓取状态
    pub crawl_status: CrawlStatus,
    /// 上次成功抓取时间
    pub last_crawl_at: Option<DateTime<Utc>>,
    /// 下次计划抓取时间，为空表示立即可抓
    pub next_crawl_at: Option<DateTime<Utc>>,
    /// 最近一次失败的错误信息
    pub crawl_error: Option<String>,
    /// 连续失败次数，成功后清零
    pub consecutive_failures: i32,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 创作者抓取状态
///
/// 状态转换：
/// Idle/Failed → Crawling → Idle/Failed，连续失败超过阈值后进入 NeedsAttention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    /// 空闲
    #[default]
    Idle,
    /// 抓取中
    Crawling,
    /// 上次抓取失败
    Failed,
    /// 连续失败过多，等待人工处理
    NeedsAttention,
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CrawlStatus::Idle => write!(f, "idle"),
            CrawlStatus::Crawling => write!(f, "crawling"),
            CrawlStatus::Failed => write!(f, "failed"),
            CrawlStatus::NeedsAttention => write!(f, "needs_attention"),
        }
    }
}

impl FromStr for CrawlStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(CrawlStatus::Idle),
            "crawling" => Ok(CrawlStatus::Crawling),
            "failed" => Ok(CrawlStatus::Failed),
            "needs_attention" => Ok(CrawlStatus::NeedsAttention),
            _ => Err(()),
        }
    }
}

impl Creator {
    /// 创建一个新的创作者，默认开启自动抓取且立即可抓
    pub fn new(
        platform: Platform,
        profile_url: impl Into<String>,
        display_name: impl Into<String>,
        crawl_interval: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            platform,
            profile_url: profile_url.into(),
            display_name: display_name.into(),
            auto_crawl_enabled: true,
            crawl_interval,
            crawl_status: CrawlStatus::Idle,
            last_crawl_at: None,
            next_crawl_at: None,
            crawl_error: None,
            consecutive_failures: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否应在本轮发现中被派发
    ///
    /// 与仓库层的到期查询保持一致：
    /// auto_crawl_enabled ∧ 非 crawling/needs_attention ∧ (next_crawl_at ≤ now ∨ 未设置)
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.auto_crawl_enabled
            && !matches!(
                self.crawl_status,
                CrawlStatus::Crawling | CrawlStatus::NeedsAttention
            )
            && self.next_crawl_at.is_none_or(|next| next <= now)
    }

    /// 成功抓取后的下次抓取时间
    pub fn next_crawl_after(&self, finished_at: DateTime<Utc>) -> DateTime<Utc> {
        finished_at + Duration::minutes(i64::from(self.crawl_interval.max(1)))
    }
}
