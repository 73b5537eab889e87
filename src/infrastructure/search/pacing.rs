// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::search::engine::SearchError;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

const PC_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// 随机选择一个桌面浏览器 UA
pub fn random_user_agent() -> &'static str {
    PC_USER_AGENTS[rand::random_range(0..PC_USER_AGENTS.len())]
}

/// 搜索请求节流器
///
/// 每个搜索引擎持有一个，限制对同一引擎的请求速率
pub struct SearchPacer {
    limiter: DefaultDirectRateLimiter,
}

impl SearchPacer {
    pub fn per_second(requests: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// 等待直到允许发出下一次请求
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

/// 以节流方式获取搜索结果页
///
/// 429/403 视为被限流，其余非 2xx 返回 `HttpStatus`
pub async fn fetch_search_page(
    client: &reqwest::Client,
    pacer: &SearchPacer,
    url: &str,
    params: &[(&str, String)],
    timeout: Duration,
) -> Result<String, SearchError> {
    pacer.wait().await;

    let url = match serde_urlencoded::to_string(params) {
        Ok(query) if !query.is_empty() => format!("{}?{}", url, query),
        Ok(_) => url.to_string(),
        Err(e) => return Err(SearchError::EngineError(format!("invalid query: {}", e))),
    };

    let response = client
        .get(&url)
        .timeout(timeout)
        .header("User-Agent", random_user_agent())
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8")
        .send()
        .await?;

    let status = response.status().as_u16();
    debug!(%url, status, "Search page fetched");
    match status {
        200..=299 => {}
        403 | 429 => return Err(SearchError::RateLimitExceeded),
        code => return Err(SearchError::HttpStatus(code)),
    }

    Ok(response.text().await?)
}

/// 页面内容是否为验证码/反爬页面
pub fn looks_like_captcha(content: &str) -> bool {
    content.contains("<title>Robot Check</title>")
        || content.contains("captcha")
        || content.contains("wappass.baidu.com")
        || content.contains("百度安全验证")
        || content.contains("antispam")
        || content.contains("请输入验证码")
}
