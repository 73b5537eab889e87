// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid html tag pattern"));
static SCRIPT_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>")
        .expect("valid script pattern")
});

/// 折叠连续空白为单个空格并去除首尾空白
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 去除 HTML 标签、解码实体并折叠空白
///
/// * `<p>Hello <b>world</b></p>` → `Hello world`
/// * `Tom &amp; Jerry` → `Tom & Jerry`
pub fn clean_html_text(html: &str) -> String {
    let without_scripts = SCRIPT_STYLE.replace_all(html, " ");
    let without_tags = HTML_TAG.replace_all(&without_scripts, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    collapse_whitespace(&decoded)
}

/// 按字符截断，不会切断多字节字符
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// 网页中提取的可读内容
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub title: Option<String>,
    pub text: String,
    pub media_urls: Vec<String>,
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if matches!(
                    el.name(),
                    "script" | "style" | "noscript" | "template" | "svg" | "head"
                ) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

/// 从 HTML 页面提取标题、正文文本和媒体地址
///
/// 正文跳过 script/style 等不可见节点；媒体地址来自 `<img src>`、
/// `<video src>`、`<video poster>` 和 `<source src>`
pub fn extract_page_content(html: &str) -> PageContent {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|s| document.select(&s).next())
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .or_else(|| {
            Selector::parse("meta[property='og:title']")
                .ok()
                .and_then(|s| document.select(&s).next())
                .and_then(|m| m.value().attr("content"))
                .map(collapse_whitespace)
                .filter(|t| !t.is_empty())
        });

    let mut raw_text = String::new();
    let body = Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next());
    match body {
        Some(body) => collect_text(body, &mut raw_text),
        None => collect_text(document.root_element(), &mut raw_text),
    }
    let text = collapse_whitespace(&html_escape::decode_html_entities(&raw_text));

    let mut media_urls: Vec<String> = Vec::new();
    if let Ok(selector) = Selector::parse("img[src], video[src], video[poster], source[src]") {
        for element in document.select(&selector) {
            for attr in ["src", "poster"] {
                if let Some(value) = element.value().attr(attr) {
                    let value = value.trim();
                    if !value.is_empty()
                        && !value.starts_with("data:")
                        && !media_urls.iter().any(|u| u == value)
                    {
                        media_urls.push(value.to_string());
                    }
                }
            }
        }
    }

    PageContent {
        title,
        text,
        media_urls,
    }
}
