// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 执行创作者抓取作业与临时抓取任务
pub mod crawl_worker;

pub use crawl_worker::{CrawlWorker, JobOutcome, JobStatus, WorkerConfig};
