// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::search_result::SearchResult;
use crate::utils::text_processing::collapse_whitespace;
use crate::utils::url_utils::resolve_url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// 锚文本少于该字符数的链接视为导航链接
const MIN_ANCHOR_CHARS: usize = 6;

/// 宽松的二次提取：从页面所有链接中挑出像搜索结果的条目
///
/// 主解析器因页面改版一无所获时使用。跳过搜索引擎自身域名下的导航链接，
/// `decode` 用于先还原引擎的跳转链接
pub fn extract_anchor_results(
    html: &str,
    page_url: &Url,
    engine: &'static str,
    limit: usize,
    decode: fn(&str) -> String,
) -> Vec<SearchResult> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let own_host = page_url.host_str().map(|h| h.to_ascii_lowercase());

    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for anchor in document.select(&selector) {
        if results.len() >= limit {
            break;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let title = collapse_whitespace(&anchor.text().collect::<String>());
        if title.chars().count() < MIN_ANCHOR_CHARS {
            continue;
        }
        let Ok(resolved) = resolve_url(page_url, href.trim()) else {
            continue;
        };
        let resolved = decode(resolved.as_str());
        let Ok(target) = Url::parse(&resolved) else {
            continue;
        };
        if !matches!(target.scheme(), "http" | "https") {
            continue;
        }
        let host = target.host_str().map(|h| h.to_ascii_lowercase());
        if host.is_none() || host == own_host {
            continue;
        }
        if seen.insert(target.as_str().to_string()) {
            results.push(SearchResult::new(
                title,
                target.to_string(),
                None,
                engine,
            ));
        }
    }

    results
}
