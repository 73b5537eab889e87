// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::search_result::SearchResult;
use crate::domain::search::engine::{SearchEngine, SearchError};
use crate::infrastructure::search::anchors::extract_anchor_results;
use crate::infrastructure::search::pacing::{fetch_search_page, looks_like_captcha, SearchPacer};
use crate::utils::text_processing::collapse_whitespace;
use crate::utils::url_utils::resolve_url;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

static RESULT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".vrwrap, .rb").expect("valid result selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h3").expect("valid title selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h3 > a").expect("valid link selector"));
static SNIPPET_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".str_info, .star-wiki, p").expect("valid snippet selector"));

pub struct SogouSearchEngine {
    client: reqwest::Client,
    base_url: String,
    pacer: Arc<SearchPacer>,
    timeout: Duration,
}

impl SogouSearchEngine {
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
        format!("{}/web", self.base_url)
    }

    /// 解析搜狗搜索HTML结果
    ///
    /// 结果链接多为站内 `/link?url=` 跳转，按结果页地址解析为绝对地址
    pub fn parse_search_results(
        &self,
        html_content: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if looks_like_captcha(html_content) {
            return Err(SearchError::RateLimitExceeded);
        }

        let page_url =
            Url::parse(&self.search_url()).map_err(|e| SearchError::EngineError(e.to_string()))?;
        let document = Html::parse_document(html_content);

        let mut results = Vec::new();
        for element in document.select(&RESULT_SELECTOR) {
            if results.len() >= limit {
                break;
            }
            let title = element
                .select(&TITLE_SELECTOR)
                .next()
                .map(|e| collapse_whitespace(&e.text().collect::<String>()))
                .unwrap_or_default();

            let url = element
                .select(&LINK_SELECTOR)
                .next()
                .and_then(|e| e.value().attr("href"))
                .and_then(|href| resolve_url(&page_url, href.trim()).ok())
                .map(|u| u.to_string())
                .unwrap_or_default();

            let description = element
                .select(&SNIPPET_SELECTOR)
                .next()
                .map(|e| collapse_whitespace(&e.text().collect::<String>()))
                .filter(|s| !s.is_empty());

            if !title.is_empty() && !url.is_empty() {
                results.push(SearchResult::new(title, url, description, "sogou"));
            }
        }

        if results.is_empty() {
            results = extract_anchor_results(html_content, &page_url, "sogou", limit, |u| {
                u.to_string()
            });
        }

        Ok(results)
    }
}

#[async_trait]
impl SearchEngine for SogouSearchEngine {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EngineError(
                "Search query cannot be empty".to_string(),
            ));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let params = [("query", query.to_string()), ("num", limit.to_string())];
        let html_content = fetch_search_page(
            &self.client,
            &self.pacer,
            &self.search_url(),
            &params,
            self.timeout,
        )
        .await?;

        self.parse_search_results(&html_content, limit)
    }

    fn name(&self) -> &'static str {
        "sogou"
    }
}
