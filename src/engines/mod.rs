// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 抓取引擎模块
///
/// 提供浏览器渲染与轻量 HTTP 两类远端抓取后端、熔断器以及
/// 按平台策略选择后端并回退的路由器
pub mod browser_engine;
pub mod circuit_breaker;
pub mod http_engine;
pub(crate) mod remote;
pub mod router;
pub mod traits;

use crate::config::settings::FetchSettings;
use crate::engines::browser_engine::BrowserBackend;
use crate::engines::circuit_breaker::{CircuitBreaker, CircuitConfig};
use crate::engines::http_engine::HttpBackend;
use crate::engines::router::{FetchRouter, RoutingPolicy};
use crate::engines::traits::FetchBackend;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 按配置创建抓取路由器
///
/// 只注册配置了服务地址的后端
pub fn build_fetch_router(settings: &FetchSettings, client: reqwest::Client) -> FetchRouter {
    let mut backends: Vec<Arc<dyn FetchBackend>> = Vec::new();

    if let Some(base_url) = settings.browser.base_url.as_deref().filter(|u| !u.is_empty()) {
        backends.push(Arc::new(BrowserBackend::new(
            client.clone(),
            base_url,
            settings.browser.timeout(),
        )));
    }
    if let Some(base_url) = settings.http.base_url.as_deref().filter(|u| !u.is_empty()) {
        backends.push(Arc::new(HttpBackend::new(
            client.clone(),
            base_url,
            settings.http.timeout(),
        )));
    }

    if backends.is_empty() {
        warn!("No fetch backends configured; direct acquisition is disabled");
    } else {
        info!(
            backends = ?backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
            "Fetch backends registered"
        );
    }

    let breaker = CircuitBreaker::new(CircuitConfig {
        failure_threshold: settings.circuit_breaker.failure_threshold,
        recovery_timeout: Duration::from_secs(settings.circuit_breaker.recovery_timeout_secs),
        ..Default::default()
    });

    FetchRouter::new(
        backends,
        Arc::new(breaker),
        RoutingPolicy::from_settings(settings),
    )
}
