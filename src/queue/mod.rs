// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 调度模块
///
/// 进程内的定时发现与有界并发派发
pub mod scheduler;

pub use scheduler::{
    CrawlScheduler, DiscoveryReport, SchedulerConfig, SchedulerError, SchedulerState,
    SchedulerStatus, TriggerOutcome,
};
