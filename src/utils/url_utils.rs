// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 用于去重比较的URL形式：去掉片段和查询参数、小写、去掉结尾斜杠
pub fn normalize_for_dedup(url: &str) -> String {
    let mut normalized = url.trim().to_string();
    if let Some(pos) = normalized.find('#') {
        normalized.truncate(pos);
    }
    if let Some(pos) = normalized.find('?') {
        normalized.truncate(pos);
    }
    let normalized = normalized.to_lowercase();
    let normalized = normalized
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");
    normalized.trim_end_matches('/').to_string()
}

/// URL 的主机名是否属于给定域名（含子域名）
pub fn host_matches(url: &str, domains: &[&str]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    domains
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}
