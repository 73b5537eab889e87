// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::search_result::SearchResult;
use crate::domain::search::engine::{SearchEngine, SearchError};
use crate::infrastructure::search::anchors::extract_anchor_results;
use crate::infrastructure::search::pacing::{fetch_search_page, looks_like_captcha, SearchPacer};
use crate::utils::text_processing::clean_html_text;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct BaiduResponse {
    feed: Option<BaiduFeed>,
}

#[derive(Debug, Deserialize)]
struct BaiduFeed {
    entry: Option<Vec<BaiduEntry>>,
}

#[derive(Debug, Deserialize)]
struct BaiduEntry {
    title: Option<String>,
    url: Option<String>,
    abs: Option<String>, // 摘要字段
}

/// 百度搜索引擎
///
/// 通过 `tn=json` 请求 JSON 结果；返回的不是 JSON 时按 HTML 页面做锚链接提取
pub struct BaiduSearchEngine {
    client: reqwest::Client,
    base_url: String,
    pacer: Arc<SearchPacer>,
    timeout: Duration,
}

impl BaiduSearchEngine {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        pacer: Arc<SearchPacer>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            pacer,
            timeout,
        }
    }

    fn search_url(&self) -> String {
        format!("{}/s", self.base_url)
    }

    /// 构建百度搜索参数
    pub fn build_params(query: &str, page: u32, page_size: usize) -> Vec<(&'static str, String)> {
        let offset = (page.max(1) as usize - 1) * page_size;
        vec![
            ("wd", query.to_string()),
            ("rn", page_size.to_string()),
            ("pn", offset.to_string()),
            ("tn", "json".to_string()), // 关键参数：请求 JSON 响应
        ]
    }

    /// 解析百度JSON响应
    pub fn parse_baidu_response(&self, json_text: &str) -> Result<Vec<SearchResult>, SearchError> {
        let data: BaiduResponse = serde_json::from_str(json_text)
            .map_err(|e| SearchError::EngineError(format!("JSON parsing error: {}", e)))?;

        let entries = data.feed.and_then(|f| f.entry).unwrap_or_default();
        let results = entries
            .into_iter()
            .filter_map(|entry| {
                let title = clean_html_text(&entry.title?);
                let url = entry.url?;
                if title.is_empty() || !url.starts_with("http") {
                    return None;
                }
                let description = entry
                    .abs
                    .map(|abs| clean_html_text(&abs))
                    .filter(|abs| !abs.is_empty());
                Some(SearchResult::new(title, url, description, "baidu"))
            })
            .collect();

        Ok(results)
    }

    /// 解析响应体：优先 JSON，失败时检查验证码并回退到锚链接提取
    pub fn parse_response(&self, body: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        match self.parse_baidu_response(body) {
            Ok(mut results) => {
                results.truncate(limit);
                Ok(results)
            }
            Err(err) => {
                if looks_like_captcha(body) {
                    return Err(SearchError::RateLimitExceeded);
                }
                let page_url = Url::parse(&self.search_url())
                    .map_err(|e| SearchError::EngineError(e.to_string()))?;
                let results = extract_anchor_results(body, &page_url, "baidu", limit, |u| {
                    u.to_string()
                });
                if results.is_empty() {
                    return Err(err);
                }
                debug!(count = results.len(), "Baidu JSON parse failed, used anchor fallback");
                Ok(results)
            }
        }
    }
}

#[async_trait]
impl SearchEngine for BaiduSearchEngine {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EngineError(
                "Search query cannot be empty".to_string(),
            ));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let params = Self::build_params(query, 1, limit.min(50));
        let body = fetch_search_page(
            &self.client,
            &self.pacer,
            &self.search_url(),
            &params,
            self.timeout,
        )
        .await?;

        self.parse_response(&body, limit)
    }

    fn name(&self) -> &'static str {
        "baidu"
    }
}
