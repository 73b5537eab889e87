// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 内容可信度
///
/// 区分直接从平台获取、经搜索引擎发现以及合成占位的内容，
/// 下游可以据此决定是否使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    Direct,
    Discovered,
    Synthetic,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Confidence::Direct => write!(f, "direct"),
            Confidence::Discovered => write!(f, "discovered"),
            Confidence::Synthetic => write!(f, "synthetic"),
        }
    }
}

impl FromStr for Confidence {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Confidence::Direct),
            "discovered" => Ok(Confidence::Discovered),
            "synthetic" => Ok(Confidence::Synthetic),
            _ => Err(()),
        }
    }
}

/// 内容获取层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionTier {
    /// 爬虫会话服务
    Session,
    /// 浏览器/HTTP 后端直接抓取
    Direct,
    /// 搜索引擎发现
    Discovery,
    /// 合成占位内容
    Placeholder,
}

impl AcquisitionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionTier::Session => "session",
            AcquisitionTier::Direct => "direct",
            AcquisitionTier::Discovery => "discovery",
            AcquisitionTier::Placeholder => "placeholder",
        }
    }

    /// 该层级产出内容的可信度
    pub fn confidence(&self) -> Confidence {
        match self {
            AcquisitionTier::Session | AcquisitionTier::Direct => Confidence::Direct,
            AcquisitionTier::Discovery => Confidence::Discovered,
            AcquisitionTier::Placeholder => Confidence::Synthetic,
        }
    }
}

impl fmt::Display for AcquisitionTier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 原始内容条目
///
/// 各获取层级返回的未规范化数据，字段可能包含 HTML 标签和多余空白
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub origin_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content")]
    pub body: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "publish_time")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
}

/// 一次获取的结果
///
/// 条目列表保证非空，并标注产生它的层级和来源
#[derive(Debug, Clone)]
pub struct AcquiredContent {
    pub items: Vec<RawItem>,
    pub tier: AcquisitionTier,
    /// 实际产生内容的后端或搜索引擎名称
    pub source: String,
}

impl AcquiredContent {
    pub fn new(items: Vec<RawItem>, tier: AcquisitionTier, source: impl Into<String>) -> Self {
        Self {
            items,
            tier,
            source: source.into(),
        }
    }

    pub fn confidence(&self) -> Confidence {
        self.tier.confidence()
    }
}
