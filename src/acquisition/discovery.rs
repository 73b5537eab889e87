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

use super::strategy::{AcquisitionError, AcquisitionRequest, AcquisitionStrategy};
use crate::domain::models::platform::Platform;
use crate::domain::models::raw_item::{AcquiredContent, AcquisitionTier, RawItem};
use crate::domain::models::search_result::SearchResult;
use crate::domain::search::engine::SearchEngine;
use crate::utils::text_processing::collapse_whitespace;
use crate::utils::url_utils::{host_matches, normalize_for_dedup};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// 搜索发现层
///
/// 面向没有可靠直接抓取路径的平台：依次查询各搜索引擎，
/// 过滤与平台或创作者无关的结果，并按URL与标题相似度去重
pub struct DiscoveryStrategy {
    engines: Vec<Arc<dyn SearchEngine>>,
    max_results: usize,
    title_similarity_threshold: f64,
}

impl DiscoveryStrategy {
    pub fn new(
        engines: Vec<Arc<dyn SearchEngine>>,
        max_results: usize,
        title_similarity_threshold: f64,
    ) -> Self {
        Self {
            engines,
            max_results: max_results.max(1),
            title_similarity_threshold,
        }
    }

    /// 构造搜索词：主体名称加平台限定词
    pub fn build_query(request: &AcquisitionRequest) -> String {
        match request.platform.search_qualifier() {
            Some(qualifier) => format!("{} {}", request.subject(), qualifier),
            None => request.subject(),
        }
    }

    /// 结果是否与平台或创作者相关
    pub fn is_relevant(result: &SearchResult, platform: Platform, subject: &str) -> bool {
        if host_matches(&result.url, platform.domains()) {
            return true;
        }

        let haystack = format!(
            "{} {}",
            result.title,
            result.description.as_deref().unwrap_or_default()
        )
        .to_lowercase();

        let subject = subject.trim().to_lowercase();
        if !subject.is_empty() && haystack.contains(&subject) {
            return true;
        }

        platform
            .keywords()
            .iter()
            .any(|keyword| haystack.contains(&keyword.to_lowercase()))
    }

    fn normalize_title(title: &str) -> String {
        collapse_whitespace(title).to_lowercase()
    }

    /// 按URL和标题相似度去重，保留先出现的结果
    pub fn deduplicate(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        let mut seen_urls = HashSet::new();
        let mut kept_titles: Vec<String> = Vec::new();
        let mut unique = Vec::new();

        for result in results {
            if !seen_urls.insert(normalize_for_dedup(&result.url)) {
                continue;
            }
            let title = Self::normalize_title(&result.title);
            let similar = kept_titles.iter().any(|existing| {
                strsim::jaro_winkler(existing, &title) >= self.title_similarity_threshold
            });
            if similar {
                continue;
            }
            kept_titles.push(title);
            unique.push(result);
        }

        unique
    }

    fn to_item(result: SearchResult, author: Option<String>) -> RawItem {
        let body = result
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| result.title.clone());
        RawItem {
            origin_id: None,
            title: result.title,
            body,
            author,
            url: Some(result.url),
            published_at: None,
            tags: Vec::new(),
            media_urls: Vec::new(),
        }
    }
}

#[async_trait]
impl AcquisitionStrategy for DiscoveryStrategy {
    async fn acquire(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<AcquiredContent, AcquisitionError> {
        if self.engines.is_empty() {
            return Err(AcquisitionError::NotConfigured("discovery"));
        }

        let query = Self::build_query(request);
        let subject = request.subject();
        let wanted = request.limit.min(self.max_results);

        let mut collected: Vec<SearchResult> = Vec::new();
        let mut contributing: Vec<&'static str> = Vec::new();
        let mut errors = Vec::new();

        for engine in &self.engines {
            match engine.search(&query, self.max_results).await {
                Ok(results) => {
                    let before = collected.len();
                    let relevant: Vec<_> = results
                        .into_iter()
                        .filter(|r| Self::is_relevant(r, request.platform, &subject))
                        .collect();
                    collected.extend(relevant);
                    collected = self.deduplicate(collected);
                    debug!(
                        engine = engine.name(),
                        query = %query,
                        added = collected.len() - before,
                        "Search engine results merged"
                    );
                    if collected.len() > before {
                        contributing.push(engine.name());
                    }
                }
                Err(e) => {
                    warn!(engine = engine.name(), query = %query, error = %e, "Search engine failed");
                    errors.push(format!("{}: {}", engine.name(), e));
                }
            }

            if collected.len() >= wanted {
                break;
            }
        }

        if collected.is_empty() {
            return Err(if errors.is_empty() {
                AcquisitionError::NoContent(format!("no relevant results for '{}'", query))
            } else {
                AcquisitionError::Search(errors.join("; "))
            });
        }

        collected.truncate(wanted);
        let items = collected
            .into_iter()
            .map(|r| Self::to_item(r, request.display_name.clone()))
            .collect();

        Ok(AcquiredContent::new(
            items,
            AcquisitionTier::Discovery,
            contributing.join("+"),
        ))
    }

    fn tier(&self) -> AcquisitionTier {
        AcquisitionTier::Discovery
    }

    fn applies_to(&self, platform: Platform) -> bool {
        !platform.has_reliable_direct_path()
    }
}
