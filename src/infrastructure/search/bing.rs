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
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

static RESULT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<li class="b_algo"[^>]*>(.*?)</li>"#).expect("Failed to compile result regex")
});
static TITLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<h2[^>]*>(.*?)</h2>"#).expect("Failed to compile title regex"));
static LINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a[^>]*href="([^"]*)"[^>]*>"#).expect("Failed to compile link regex")
});
static SNIPPET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<p[^>]*>(.*?)</p>"#).expect("Failed to compile snippet regex"));

/// Bing 搜索引擎
///
/// 主解析使用正则匹配 `li.b_algo` 结果块，页面结构变化导致主解析为空时
/// 回退到宽松的锚链接提取
pub struct BingSearchEngine {
    client: reqwest::Client,
    base_url: String,
    pacer: Arc<SearchPacer>,
    timeout: Duration,
}

impl BingSearchEngine {
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
        format!("{}/search", self.base_url)
    }

    /// Build Bing search parameters
    ///
    /// 查询词同时放入 q 与 pq；第 2 页起使用 first 偏移和 FORM 参数
    pub fn build_params(query: &str, page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", query.to_string()), ("pq", query.to_string())];

        if page > 1 {
            params.push(("first", ((page - 1) * 10 + 1).to_string()));
            let form_value = if page == 2 {
                "PERE".to_string()
            } else {
                format!("PERE{}", page - 2)
            };
            params.push(("FORM", form_value));
        }

        params
    }

    /// Decode Bing redirect URLs that are Base64 encoded
    ///
    /// `/ck/a?u=a1<base64>` 形式的跳转链接还原为目标地址，其他地址原样返回
    pub fn decode_bing_url(url: &str) -> String {
        let Ok(parsed_url) = Url::parse(url) else {
            return url.to_string();
        };
        if parsed_url.path() != "/ck/a" {
            return url.to_string();
        }

        let encoded = parsed_url
            .query_pairs()
            .find(|(key, _)| key == "u")
            .and_then(|(_, value)| value.strip_prefix("a1").map(str::to_string));

        if let Some(encoded) = encoded {
            let padding = "=".repeat((4 - encoded.len() % 4) % 4);
            if let Ok(decoded_bytes) = URL_SAFE.decode(format!("{}{}", encoded, padding)) {
                if let Ok(decoded_str) = String::from_utf8(decoded_bytes) {
                    return decoded_str;
                }
            }
        }
        url.to_string()
    }

    /// 解析 Bing 结果页
    pub fn parse_search_results(
        &self,
        html: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if html.trim().is_empty() {
            return Err(SearchError::EngineError(
                "Empty HTML response received".to_string(),
            ));
        }

        if looks_like_captcha(html) {
            return Err(SearchError::RateLimitExceeded);
        }

        if html.contains(r#"<div class="b_no">"#) || html.contains("No results found") {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for result_match in RESULT_REGEX.captures_iter(html) {
            if results.len() >= limit {
                break;
            }
            let result_html = result_match.get(1).map(|m| m.as_str()).unwrap_or_default();

            let title_html = TITLE_REGEX
                .captures(result_html)
                .and_then(|cap| cap.get(1))
                .map(|m| m.as_str())
                .unwrap_or_default();

            let url = LINK_REGEX
                .captures(title_html)
                .and_then(|cap| cap.get(1))
                .map(|m| Self::decode_bing_url(&html_escape::decode_html_entities(m.as_str())))
                .unwrap_or_default();

            let title = clean_html_text(title_html);
            let snippet = SNIPPET_REGEX
                .captures(result_html)
                .and_then(|cap| cap.get(1))
                .map(|m| clean_html_text(m.as_str()))
                .filter(|s| !s.is_empty());

            if title.is_empty() || !url.starts_with("http") {
                continue;
            }

            results.push(SearchResult::new(title, url, snippet, self.name()));
        }

        if results.is_empty() {
            let page_url = Url::parse(&self.search_url())
                .map_err(|e| SearchError::EngineError(e.to_string()))?;
            results = extract_anchor_results(html, &page_url, "bing", limit, Self::decode_bing_url);
            if !results.is_empty() {
                debug!(count = results.len(), "Bing primary parse empty, used anchor fallback");
            }
        }

        Ok(results)
    }
}

#[async_trait]
impl SearchEngine for BingSearchEngine {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EngineError(
                "Search query cannot be empty".to_string(),
            ));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let params = Self::build_params(query, 1);
        let html = fetch_search_page(
            &self.client,
            &self.pacer,
            &self.search_url(),
            &params,
            self.timeout,
        )
        .await?;

        self.parse_search_results(&html, limit)
    }

    fn name(&self) -> &'static str {
        "bing"
    }
}
