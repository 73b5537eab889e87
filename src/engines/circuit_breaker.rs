// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{counter, gauge};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// 熔断器配置
#[derive(Clone, Debug)]
pub struct CircuitConfig {
    /// 失败阈值
    pub failure_threshold: u32,
    /// 恢复超时时间
    pub recovery_timeout: Duration,
    /// 失败时间窗口
    pub failure_window: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            failure_window: Duration::from_secs(120),
        }
    }
}

/// 熔断器状态枚举
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// 关闭状态
    Closed,
    /// 打开状态
    Open,
    /// 半开状态，放行一次试探请求
    HalfOpen,
}

#[derive(Debug)]
struct CircuitState {
    status: Status,
    failure_timestamps: VecDeque<Instant>,
    opened_at: Option<Instant>,
}

impl Default for CircuitState {
    fn default() -> Self {
        Self {
            status: Status::Closed,
            failure_timestamps: VecDeque::new(),
            opened_at: None,
        }
    }
}

/// 熔断器
///
/// 按后端名称维护独立状态，窗口内失败次数达到阈值后打开，
/// 恢复超时后进入半开，试探成功则关闭
pub struct CircuitBreaker {
    states: Mutex<HashMap<String, CircuitState>>,
    config: CircuitConfig,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// 检查熔断器是否打开
    ///
    /// 打开时间超过恢复超时的熔断器会在此处转为半开并放行
    pub fn is_open(&self, backend: &str) -> bool {
        let mut states = self.states.lock();
        let state = states.entry(backend.to_string()).or_default();

        match state.status {
            Status::Closed | Status::HalfOpen => false,
            Status::Open => {
                let recovered = state
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.recovery_timeout);
                if recovered {
                    state.status = Status::HalfOpen;
                    update_status_metric(backend, Status::HalfOpen);
                    return false;
                }
                counter!("circuit_breaker_rejected_total", "backend" => backend.to_string())
                    .increment(1);
                true
            }
        }
    }

    /// 记录成功
    pub fn record_success(&self, backend: &str) {
        let mut states = self.states.lock();
        let state = states.entry(backend.to_string()).or_default();
        if state.status != Status::Closed {
            update_status_metric(backend, Status::Closed);
        }
        state.status = Status::Closed;
        state.failure_timestamps.clear();
        state.opened_at = None;
    }

    /// 记录失败
    pub fn record_failure(&self, backend: &str) {
        let mut states = self.states.lock();
        let state = states.entry(backend.to_string()).or_default();

        let now = Instant::now();
        state.failure_timestamps.push_back(now);
        while let Some(front) = state.failure_timestamps.front() {
            if now.duration_since(*front) > self.config.failure_window {
                state.failure_timestamps.pop_front();
            } else {
                break;
            }
        }

        let should_open = match state.status {
            Status::HalfOpen => true,
            Status::Closed => {
                state.failure_timestamps.len() >= self.config.failure_threshold.max(1) as usize
            }
            Status::Open => false,
        };

        if should_open {
            state.status = Status::Open;
            state.opened_at = Some(now);
            update_status_metric(backend, Status::Open);
        }
    }

    /// 当前状态
    pub fn status(&self, backend: &str) -> Status {
        self.states
            .lock()
            .get(backend)
            .map(|s| s.status)
            .unwrap_or(Status::Closed)
    }
}

fn update_status_metric(backend: &str, status: Status) {
    let val = match status {
        Status::Closed => 0.0,
        Status::Open => 1.0,
        Status::HalfOpen => 0.5,
    };
    gauge!("circuit_breaker_status", "backend" => backend.to_string()).set(val);
}
