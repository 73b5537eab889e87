// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::RetrySettings;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// 失败退避策略
///
/// 决定创作者抓取失败后多久再次参与发现，以及连续失败多少次后停止自动抓取
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 是否推迟失败创作者的下次抓取
    pub enabled: bool,
    /// 初始退避时间
    pub initial_backoff: Duration,
    /// 最大退避时间
    pub max_backoff: Duration,
    /// 退避乘数
    pub backoff_multiplier: f64,
    /// 抖动因子 (0.0-1.0)
    pub jitter_factor: f64,
    /// 连续失败阈值，0 表示不限制
    pub max_consecutive_failures: i32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            enabled: settings.failure_backoff_enabled,
            initial_backoff: Duration::from_secs(settings.base_delay_secs),
            max_backoff: Duration::from_secs(settings.max_delay_secs.max(settings.base_delay_secs)),
            backoff_multiplier: settings.multiplier.max(1.0),
            jitter_factor: settings.jitter.clamp(0.0, 1.0),
            max_consecutive_failures: settings.max_consecutive_failures,
        }
    }

    /// 计算第 `attempt` 次连续失败后的退避时间
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let backoff_secs = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped_backoff = backoff_secs.min(self.max_backoff.as_secs_f64());

        let jitter_range = capped_backoff * self.jitter_factor;
        let final_backoff = if jitter_range > 0.0 {
            (capped_backoff + rand::random_range(-jitter_range..jitter_range)).max(0.0)
        } else {
            capped_backoff
        };

        Duration::from_secs_f64(final_backoff)
    }

    /// 失败后的下次抓取时间
    ///
    /// 未启用退避时返回 None，调用方保持原有 next_crawl_at 不变
    pub fn next_attempt_at(
        &self,
        consecutive_failures: i32,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if !self.enabled {
            return None;
        }
        let backoff = self.calculate_backoff(consecutive_failures.max(1) as u32);
        Some(now + chrono::Duration::milliseconds(backoff.as_millis() as i64))
    }

    /// 连续失败次数是否已达到需要人工处理的阈值
    pub fn exhausted(&self, consecutive_failures: i32) -> bool {
        self.enabled
            && self.max_consecutive_failures > 0
            && consecutive_failures >= self.max_consecutive_failures
    }
}
