// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::json;
use socialcrawl::acquisition::{build_content_router, AcquisitionRequest};
use socialcrawl::config::settings::{EndpointSettings, FetchSettings, Settings};
use socialcrawl::domain::models::platform::Platform;
use socialcrawl::domain::models::raw_item::{AcquisitionTier, Confidence};
use socialcrawl::engines::build_fetch_router;
use socialcrawl::engines::traits::{BackendKind, EngineError, FetchRequest};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint(server: &MockServer, timeout_secs: u64) -> EndpointSettings {
    EndpointSettings {
        base_url: Some(server.uri()),
        timeout_secs,
    }
}

fn page(text: &str) -> serde_json::Value {
    json!({
        "success": true,
        "content": format!("<html><head><title>主页</title></head><body><p>{}</p></body></html>", text),
        "title": "测试博主的主页",
        "url": "https://weibo.com/u/1001",
    })
}

/// 浏览器后端返回 500 时，微博请求回退到 HTTP 后端
#[tokio::test]
async fn test_weibo_falls_back_to_http_when_browser_errors() {
    let browser = MockServer::start().await;
    let http = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&browser)
        .await;
    Mock::given(method("POST"))
        .and(path("/fetch"))
        .and(body_partial_json(json!({ "url": "https://weibo.com/u/1001" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("今天天气不错")))
        .expect(1)
        .mount(&http)
        .await;

    let settings = FetchSettings {
        browser: endpoint(&browser, 5),
        http: endpoint(&http, 5),
        ..Default::default()
    };
    let router = build_fetch_router(&settings, reqwest::Client::new());

    let response = router
        .route(&FetchRequest::new("https://weibo.com/u/1001", Platform::Weibo))
        .await
        .unwrap();
    assert_eq!(response.backend, BackendKind::Http);
    assert!(response.content.contains("今天天气不错"));

    let stats = router.stats();
    assert_eq!(stats[&BackendKind::Browser].failures, 1);
    assert_eq!(stats[&BackendKind::Http].successes, 1);
}

/// success:false 视为失败并前进到下一个后端
#[tokio::test]
async fn test_success_false_counts_as_backend_failure() {
    let browser = MockServer::start().await;
    let http = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "login wall" })),
        )
        .mount(&browser)
        .await;
    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("fallback body")))
        .mount(&http)
        .await;

    let settings = FetchSettings {
        browser: endpoint(&browser, 5),
        http: endpoint(&http, 5),
        ..Default::default()
    };
    let router = build_fetch_router(&settings, reqwest::Client::new());

    let response = router
        .route(&FetchRequest::new("https://weibo.com/u/1001", Platform::Weibo))
        .await
        .unwrap();
    assert_eq!(response.backend, BackendKind::Http);

    let browser_stats = &router.stats()[&BackendKind::Browser];
    assert_eq!(browser_stats.failures, 1);
    assert!(browser_stats
        .last_error
        .as_deref()
        .is_some_and(|e| e.contains("login wall")));
}

/// 关闭回退后，JS 平台只尝试浏览器后端
#[tokio::test]
async fn test_fallback_disabled_keeps_js_platform_on_browser() {
    let browser = MockServer::start().await;
    let http = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&browser)
        .await;
    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("never used")))
        .expect(0)
        .mount(&http)
        .await;

    let settings = FetchSettings {
        browser: endpoint(&browser, 5),
        http: endpoint(&http, 5),
        fallback_enabled: false,
        ..Default::default()
    };
    let router = build_fetch_router(&settings, reqwest::Client::new());

    let err = router
        .route(&FetchRequest::new("https://weibo.com/u/1001", Platform::Weibo))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::HttpStatus(503)));
}

/// 非 JS 平台按默认顺序优先使用 HTTP 后端
#[tokio::test]
async fn test_light_platform_prefers_http() {
    let browser = MockServer::start().await;
    let http = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("browser body")))
        .expect(0)
        .mount(&browser)
        .await;
    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("http body")))
        .expect(1)
        .mount(&http)
        .await;

    let settings = FetchSettings {
        browser: endpoint(&browser, 5),
        http: endpoint(&http, 5),
        ..Default::default()
    };
    let router = build_fetch_router(&settings, reqwest::Client::new());

    let response = router
        .route(&FetchRequest::new(
            "https://www.zhihu.com/people/someone",
            Platform::Zhihu,
        ))
        .await
        .unwrap();
    assert_eq!(response.backend, BackendKind::Http);
}

fn chain_settings() -> Settings {
    let mut settings = Settings::default();
    settings.discovery.enabled = false;
    settings.placeholder.enabled = false;
    settings
}

/// 会话服务可用时直接使用其返回的帖子
#[tokio::test]
async fn test_session_tier_is_preferred_when_configured() {
    let session = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/crawl"))
        .and(body_partial_json(json!({ "platform": "weibo" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [
                { "origin_id": "m1", "title": "动态一", "body": "第一条" },
                { "origin_id": "m2", "title": "动态二", "body": "第二条" }
            ],
            "total": 2
        })))
        .expect(1)
        .mount(&session)
        .await;

    let mut settings = chain_settings();
    settings.fetch.crawler_service = endpoint(&session, 5);

    let client = reqwest::Client::new();
    let fetch_router = Arc::new(build_fetch_router(&settings.fetch, client.clone()));
    let content_router = build_content_router(&settings, client, fetch_router, Vec::new());

    let content = content_router
        .acquire(&AcquisitionRequest::new(
            Platform::Weibo,
            "https://weibo.com/u/1001",
            10,
        ))
        .await
        .unwrap();
    assert_eq!(content.tier, AcquisitionTier::Session);
    assert_eq!(content.items.len(), 2);
    assert_eq!(content.items[0].origin_id.as_deref(), Some("m1"));
}

/// 会话服务失败后降级到直接抓取
#[tokio::test]
async fn test_session_failure_degrades_to_direct() {
    let session = MockServer::start().await;
    let http = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/crawl"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&session)
        .await;
    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("直接抓取的内容")))
        .mount(&http)
        .await;

    let mut settings = chain_settings();
    settings.fetch.crawler_service = endpoint(&session, 5);
    settings.fetch.http = endpoint(&http, 5);

    let client = reqwest::Client::new();
    let fetch_router = Arc::new(build_fetch_router(&settings.fetch, client.clone()));
    let content_router = build_content_router(&settings, client, fetch_router, Vec::new());

    let content = content_router
        .acquire(
            &AcquisitionRequest::new(Platform::Weibo, "https://weibo.com/u/1001", 10)
                .with_display_name("测试博主"),
        )
        .await
        .unwrap();
    assert_eq!(content.tier, AcquisitionTier::Direct);
    assert_eq!(content.source, "http");
    assert_eq!(content.items.len(), 1);
    assert_eq!(content.items[0].title, "测试博主的主页");
    assert!(content.items[0].body.contains("直接抓取的内容"));
}

/// 所有真实层级失败时，占位层产出合成内容
#[tokio::test]
async fn test_placeholder_tier_marks_content_synthetic() {
    let browser = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&browser)
        .await;

    let mut settings = chain_settings();
    settings.placeholder.enabled = true;
    settings.fetch.browser = endpoint(&browser, 5);

    let client = reqwest::Client::new();
    let fetch_router = Arc::new(build_fetch_router(&settings.fetch, client.clone()));
    let content_router = build_content_router(&settings, client, fetch_router, Vec::new());

    let content = content_router
        .acquire(
            &AcquisitionRequest::new(Platform::Weibo, "https://weibo.com/u/1001", 10)
                .with_display_name("测试博主"),
        )
        .await
        .unwrap();
    assert_eq!(content.tier, AcquisitionTier::Placeholder);
    assert_eq!(content.confidence(), Confidence::Synthetic);
    assert_eq!(content.items.len(), 1);
}

/// 未配置任何层级时获取失败
#[tokio::test]
async fn test_chain_without_tiers_fails() {
    let settings = chain_settings();
    let client = reqwest::Client::new();
    let fetch_router = Arc::new(build_fetch_router(&settings.fetch, client.clone()));
    let content_router = build_content_router(&settings, client, fetch_router, Vec::new());

    let result = content_router
        .acquire(&AcquisitionRequest::new(
            Platform::Weibo,
            "https://weibo.com/u/1001",
            10,
        ))
        .await;
    assert!(result.is_err());
}

/// HTTP 后端超时后回退到浏览器后端
#[tokio::test]
async fn test_http_timeout_falls_back_to_browser() {
    let browser = MockServer::start().await;
    let http = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page("too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&http)
        .await;
    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("rendered")))
        .mount(&browser)
        .await;

    let settings = FetchSettings {
        browser: endpoint(&browser, 5),
        http: endpoint(&http, 1),
        ..Default::default()
    };
    let router = build_fetch_router(&settings, reqwest::Client::new());

    let response = router
        .route(&FetchRequest::new(
            "https://www.zhihu.com/people/someone",
            Platform::Zhihu,
        ))
        .await
        .unwrap();
    assert_eq!(response.backend, BackendKind::Browser);
    assert!(response.content.contains("rendered"));
    assert!(router.stats()[&BackendKind::Http]
        .last_error
        .as_deref()
        .is_some_and(|e| e.contains("Timeout")));
}

/// 普通网页所有后端失败时直接报错，不生成合成内容
#[tokio::test]
async fn test_general_platform_fails_instead_of_placeholder() {
    let browser = MockServer::start().await;
    let http = MockServer::start().await;
    for server in [&browser, &http] {
        Mock::given(method("POST"))
            .and(path("/fetch"))
            .respond_with(ResponseTemplate::new(500))
            .mount(server)
            .await;
    }

    let mut settings = Settings::default();
    settings.placeholder.enabled = true;
    settings.fetch.browser = endpoint(&browser, 5);
    settings.fetch.http = endpoint(&http, 5);

    let client = reqwest::Client::new();
    let fetch_router = Arc::new(build_fetch_router(&settings.fetch, client.clone()));
    let content_router = build_content_router(&settings, client, fetch_router, Vec::new());

    let result = content_router
        .acquire(&AcquisitionRequest::new(
            Platform::General,
            "https://example.com/a",
            5,
        ))
        .await;
    assert!(result.is_err());

    let weibo = content_router
        .acquire(&AcquisitionRequest::new(
            Platform::Weibo,
            "https://weibo.com/u/1001",
            5,
        ))
        .await
        .unwrap();
    assert_eq!(weibo.tier, AcquisitionTier::Placeholder);
}
