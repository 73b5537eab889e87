// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::DiscoverySettings;
use crate::domain::search::engine::SearchEngine;
use crate::infrastructure::search::baidu::BaiduSearchEngine;
use crate::infrastructure::search::bing::BingSearchEngine;
use crate::infrastructure::search::pacing::SearchPacer;
use crate::infrastructure::search::sogou::SogouSearchEngine;
use std::sync::Arc;
use tracing::{info, warn};

/// 搜索引擎类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchEngineType {
    /// Bing 搜索引擎
    Bing,
    /// 百度搜索引擎
    Baidu,
    /// 搜狗搜索引擎
    Sogou,
}

impl SearchEngineType {
    /// 获取引擎名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bing => "bing",
            Self::Baidu => "baidu",
            Self::Sogou => "sogou",
        }
    }

    /// 从字符串解析引擎类型
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bing" => Some(Self::Bing),
            "baidu" => Some(Self::Baidu),
            "sogou" => Some(Self::Sogou),
            _ => None,
        }
    }
}

/// 按配置顺序创建搜索引擎，每个引擎独立节流
///
/// 未知的引擎名称会被忽略并记录警告
pub fn build_search_engines(
    settings: &DiscoverySettings,
    client: reqwest::Client,
) -> Vec<Arc<dyn SearchEngine>> {
    let timeout = settings.request_timeout();
    let mut engines: Vec<Arc<dyn SearchEngine>> = Vec::new();

    for name in &settings.engines {
        let Some(kind) = SearchEngineType::parse(name) else {
            warn!(engine = %name, "Unknown search engine in discovery.engines, ignoring");
            continue;
        };
        if engines.iter().any(|e| e.name() == kind.name()) {
            continue;
        }

        let pacer = Arc::new(SearchPacer::per_second(settings.requests_per_second));
        let engine: Arc<dyn SearchEngine> = match kind {
            SearchEngineType::Bing => Arc::new(BingSearchEngine::new(
                client.clone(),
                settings.bing_base_url.clone(),
                pacer,
                timeout,
            )),
            SearchEngineType::Baidu => Arc::new(BaiduSearchEngine::new(
                client.clone(),
                settings.baidu_base_url.clone(),
                pacer,
                timeout,
            )),
            SearchEngineType::Sogou => Arc::new(SogouSearchEngine::new(
                client.clone(),
                settings.sogou_base_url.clone(),
                pacer,
                timeout,
            )),
        };
        engines.push(engine);
    }

    info!(
        engines = ?engines.iter().map(|e| e.name()).collect::<Vec<_>>(),
        "Search engines configured"
    );
    engines
}
