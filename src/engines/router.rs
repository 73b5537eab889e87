// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::FetchSettings;
use crate::domain::models::platform::Platform;
use crate::engines::circuit_breaker::CircuitBreaker;
use crate::engines::traits::{BackendKind, EngineError, FetchBackend, FetchRequest, FetchResponse};
use metrics::counter;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 后端统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackendStats {
    /// 请求次数
    pub requests: u64,
    /// 成功次数
    pub successes: u64,
    /// 失败次数
    pub failures: u64,
    /// 被熔断跳过的次数
    pub skipped: u64,
    /// 平均响应时间（毫秒，指数平滑）
    pub avg_response_ms: f64,
    /// 最近一次错误
    pub last_error: Option<String>,
}

/// 路由策略
///
/// 决定某个平台的后端尝试顺序
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    /// 非 JS 平台的默认顺序
    pub default_priority: Vec<BackendKind>,
    /// JS 平台浏览器失败后是否回退到 HTTP
    pub fallback_enabled: bool,
    /// 平台级覆盖
    pub overrides: HashMap<Platform, Vec<BackendKind>>,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            default_priority: vec![BackendKind::Http, BackendKind::Browser],
            fallback_enabled: true,
            overrides: HashMap::new(),
        }
    }
}

fn parse_priority(names: &[String]) -> Vec<BackendKind> {
    let mut kinds = Vec::new();
    for name in names {
        match name.parse::<BackendKind>() {
            Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Ok(_) => {}
            Err(e) => warn!("Ignoring fetch priority entry: {}", e),
        }
    }
    kinds
}

impl RoutingPolicy {
    /// 从配置构建，无法识别的后端或平台名称会被忽略并记录警告
    pub fn from_settings(settings: &FetchSettings) -> Self {
        let mut default_priority = parse_priority(&settings.default_priority);
        if default_priority.is_empty() {
            default_priority = RoutingPolicy::default().default_priority;
        }

        let mut overrides = HashMap::new();
        for (name, platform_settings) in &settings.platforms {
            match name.parse::<Platform>() {
                Ok(platform) => {
                    let priority = parse_priority(&platform_settings.priority);
                    if !priority.is_empty() {
                        overrides.insert(platform, priority);
                    }
                }
                Err(e) => warn!("Ignoring fetch override: {}", e),
            }
        }

        Self {
            default_priority,
            fallback_enabled: settings.fallback_enabled,
            overrides,
        }
    }

    /// 平台的后端尝试顺序
    pub fn candidates(&self, platform: Platform) -> Vec<BackendKind> {
        if let Some(priority) = self.overrides.get(&platform) {
            return priority.clone();
        }

        if platform.is_js_heavy() {
            let mut order = vec![BackendKind::Browser];
            if self.fallback_enabled {
                order.push(BackendKind::Http);
            }
            return order;
        }

        self.default_priority.clone()
    }
}

/// 抓取路由器
///
/// 按平台策略依次尝试各后端，跳过熔断中的后端，任意失败都会前进到下一个候选
pub struct FetchRouter {
    backends: HashMap<BackendKind, Arc<dyn FetchBackend>>,
    circuit_breaker: Arc<CircuitBreaker>,
    stats: RwLock<HashMap<BackendKind, BackendStats>>,
    policy: RoutingPolicy,
}

impl FetchRouter {
    pub fn new(
        backends: Vec<Arc<dyn FetchBackend>>,
        circuit_breaker: Arc<CircuitBreaker>,
        policy: RoutingPolicy,
    ) -> Self {
        let mut registered = HashMap::new();
        let mut stats = HashMap::new();
        for backend in backends {
            stats.insert(backend.kind(), BackendStats::default());
            registered.insert(backend.kind(), backend);
        }

        Self {
            backends: registered,
            circuit_breaker,
            stats: RwLock::new(stats),
            policy,
        }
    }

    /// 当前路由策略
    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// 是否注册了任何后端
    pub fn has_backends(&self) -> bool {
        !self.backends.is_empty()
    }

    /// 平台实际可用的候选后端（已注册的）
    pub fn candidates_for(&self, platform: Platform) -> Vec<Arc<dyn FetchBackend>> {
        self.policy
            .candidates(platform)
            .into_iter()
            .filter_map(|kind| self.backends.get(&kind).cloned())
            .collect()
    }

    fn record(&self, kind: BackendKind, outcome: Result<u64, &EngineError>) {
        let mut stats = self.stats.write();
        let stat = stats.entry(kind).or_default();
        stat.requests += 1;
        match outcome {
            Ok(elapsed_ms) => {
                stat.successes += 1;
                let alpha = 0.2;
                stat.avg_response_ms = if stat.successes == 1 {
                    elapsed_ms as f64
                } else {
                    stat.avg_response_ms * (1.0 - alpha) + elapsed_ms as f64 * alpha
                };
            }
            Err(e) => {
                stat.failures += 1;
                stat.last_error = Some(e.to_string());
            }
        }
    }

    /// 路由请求
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResponse)` - 第一个成功后端的响应
    /// * `Err(EngineError)` - 所有候选都失败时返回最后一个错误
    pub async fn route(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        let candidates = self.candidates_for(request.platform);
        if candidates.is_empty() {
            warn!(platform = %request.platform, "No fetch backends configured for platform");
            return Err(EngineError::AllEnginesFailed);
        }

        let start_time = Instant::now();
        let mut last_error = None;

        for backend in candidates {
            let kind = backend.kind();
            let name = backend.name();

            if self.circuit_breaker.is_open(name) {
                debug!(backend = name, "Circuit open, skipping backend");
                self.stats.write().entry(kind).or_default().skipped += 1;
                continue;
            }

            let engine_start = Instant::now();
            match backend.fetch(request).await {
                Ok(response) => {
                    let elapsed = engine_start.elapsed();
                    self.record(kind, Ok(elapsed.as_millis() as u64));
                    self.circuit_breaker.record_success(name);
                    counter!("fetch_backend_requests_total", "backend" => name, "outcome" => "success")
                        .increment(1);

                    info!(
                        backend = name,
                        url = %request.url,
                        "Backend succeeded in {:?}, total time: {:?}",
                        elapsed,
                        start_time.elapsed()
                    );
                    return Ok(response);
                }
                Err(e) => {
                    self.record(kind, Err(&e));
                    counter!("fetch_backend_requests_total", "backend" => name, "outcome" => "failure")
                        .increment(1);
                    if e.is_retryable() {
                        self.circuit_breaker.record_failure(name);
                    }
                    warn!(backend = name, url = %request.url, error = %e, "Backend failed, trying next candidate");
                    last_error = Some(e);
                }
            }
        }

        warn!(url = %request.url, "All fetch backends failed");
        Err(last_error.unwrap_or(EngineError::AllEnginesFailed))
    }

    /// 获取后端统计信息
    pub fn stats(&self) -> HashMap<BackendKind, BackendStats> {
        self.stats.read().clone()
    }
}
