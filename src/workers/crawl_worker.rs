// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use chrono::Utc;
use metrics::{counter, histogram};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::acquisition::{AcquisitionError, AcquisitionRequest, ContentRouter};
use crate::config::settings::{RetrySettings, SchedulerSettings};
use crate::domain::models::crawl_task::{CrawlTask, DomainError, TaskResult};
use crate::domain::models::creator::{CrawlStatus, Creator};
use crate::domain::models::raw_item::{AcquiredContent, AcquisitionTier};
use crate::domain::repositories::crawl_task_repository::{CrawlTaskRepository, RepositoryError};
use crate::domain::repositories::creator_repository::{CrawlFailure, CreatorRepository};
use crate::domain::services::content_service::{normalize, ContentNormalizer, PersistSummary};
use crate::utils::retry_policy::RetryPolicy;

/// 抓取作业错误
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error("Job timed out after {0:?}")]
    Timeout(Duration),
    #[error("Failed to persist any of {0} acquired items")]
    Persist(usize),
}

/// 作业结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
    /// 创作者已被其他执行者占用
    Skipped,
}

/// 单次抓取作业的结果
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub creator_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub status: JobStatus,
    pub tier: Option<AcquisitionTier>,
    pub summary: Option<PersistSummary>,
    pub error: Option<String>,
    /// 失败后创作者所处的状态
    pub creator_status: Option<CrawlStatus>,
}

impl JobOutcome {
    fn skipped(creator_id: Uuid) -> Self {
        Self {
            creator_id: Some(creator_id),
            task_id: None,
            status: JobStatus::Skipped,
            tier: None,
            summary: None,
            error: None,
            creator_status: None,
        }
    }
}

/// 作业执行参数
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub fetch_limit: usize,
    pub store_timeout: Duration,
    pub job_timeout: Duration,
    pub task_max_attempts: i32,
    pub retry: RetryPolicy,
}

impl WorkerConfig {
    pub fn from_settings(scheduler: &SchedulerSettings, retry: &RetrySettings) -> Self {
        Self {
            fetch_limit: scheduler.fetch_limit.max(1),
            store_timeout: scheduler.store_timeout(),
            job_timeout: scheduler.job_timeout(),
            task_max_attempts: retry.task_max_attempts.max(1),
            retry: RetryPolicy::from_settings(retry),
        }
    }
}

struct Acquired {
    content: AcquiredContent,
    summary: PersistSummary,
}

/// 抓取工作者
///
/// 执行创作者抓取作业和临时抓取任务：获取内容、规范化入库、
/// 维护任务状态机以及创作者的调度状态
pub struct CrawlWorker {
    creators: Arc<dyn CreatorRepository>,
    tasks: Arc<dyn CrawlTaskRepository>,
    content_router: Arc<ContentRouter>,
    normalizer: Arc<ContentNormalizer>,
    config: WorkerConfig,
}

impl CrawlWorker {
    pub fn new(
        creators: Arc<dyn CreatorRepository>,
        tasks: Arc<dyn CrawlTaskRepository>,
        content_router: Arc<ContentRouter>,
        normalizer: Arc<ContentNormalizer>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            creators,
            tasks,
            content_router,
            normalizer,
            config,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    async fn store<T, F>(&self, fut: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        tokio::time::timeout(self.config.store_timeout, fut)
            .await
            .map_err(|_| RepositoryError::Timeout(self.config.store_timeout))?
    }

    /// 获取并入库，整体受作业超时约束
    async fn acquire_and_persist(
        &self,
        creator_id: Option<Uuid>,
        request: &AcquisitionRequest,
    ) -> Result<Acquired, WorkerError> {
        let work = async {
            let content = self.content_router.acquire(request).await?;
            let summary = self
                .normalizer
                .persist(creator_id, request.platform, &content)
                .await;
            if summary.saved == 0 && summary.duplicates == 0 && summary.failed > 0 {
                return Err(WorkerError::Persist(summary.failed));
            }
            Ok(Acquired { content, summary })
        };

        tokio::time::timeout(self.config.job_timeout, work)
            .await
            .map_err(|_| WorkerError::Timeout(self.config.job_timeout))?
    }

    fn task_result(acquired: &Acquired) -> TaskResult {
        let first = acquired.content.items.iter().find_map(normalize);
        let mut result = TaskResult {
            confidence: Some(acquired.content.confidence()),
            item_count: acquired.content.items.len(),
            saved: acquired.summary.saved,
            duplicates: acquired.summary.duplicates,
            ..Default::default()
        };
        if let Some(item) = first {
            result.title = item.title;
            result.content = item.body;
            result.author = item.author;
            result.publish_time = item.published_at;
            result.tags = item.tags;
            result.media_urls = item.media_urls;
        }
        result
    }

    /// 执行一次创作者抓取作业
    ///
    /// 先以条件更新取得抓取权；成功后按抓取间隔安排下次抓取，
    /// 失败时累加连续失败次数并按退避策略推迟，达到阈值后转为 needs_attention
    #[instrument(skip(self, creator), fields(creator_id = %creator.id, platform = %creator.platform))]
    pub async fn run_crawl_job(&self, creator: Creator) -> JobOutcome {
        let started = Instant::now();
        let outcome = self.crawl_creator(&creator).await;

        let label = match outcome.status {
            JobStatus::Succeeded => "success",
            JobStatus::Failed => "failure",
            JobStatus::Skipped => "skipped",
        };
        counter!("crawl_jobs_total", "outcome" => label).increment(1);
        histogram!("crawl_job_duration_seconds").record(started.elapsed().as_secs_f64());
        outcome
    }

    async fn crawl_creator(&self, creator: &Creator) -> JobOutcome {
        match self.store(self.creators.try_mark_crawling(creator.id)).await {
            Ok(true) => {}
            Ok(false) => {
                info!("Creator is already being crawled, skipping");
                return JobOutcome::skipped(creator.id);
            }
            Err(e) => {
                error!(error = %e, "Failed to mark creator as crawling");
                return JobOutcome {
                    status: JobStatus::Failed,
                    error: Some(e.to_string()),
                    ..JobOutcome::skipped(creator.id)
                };
            }
        }

        let request = AcquisitionRequest::new(
            creator.platform,
            creator.profile_url.clone(),
            self.config.fetch_limit,
        )
        .with_display_name(creator.display_name.clone());

        let task = CrawlTask::new(Some(creator.id), creator.platform, &creator.profile_url, 1);
        let task_id = task.id;

        let result = match self.store(self.tasks.create(&task)).await {
            Ok(_) => self.execute_task(task, &request).await,
            Err(e) => Err(e.into()),
        };

        let finished_at = Utc::now();
        match result {
            Ok(acquired) => {
                let next = creator.next_crawl_after(finished_at);
                if let Err(e) = self
                    .store(self.creators.record_success(creator.id, finished_at, next))
                    .await
                {
                    error!(error = %e, "Failed to record crawl success");
                }
                info!(
                    tier = %acquired.content.tier,
                    saved = acquired.summary.saved,
                    duplicates = acquired.summary.duplicates,
                    next_crawl_at = %next,
                    "Crawl job succeeded"
                );
                JobOutcome {
                    creator_id: Some(creator.id),
                    task_id: Some(task_id),
                    status: JobStatus::Succeeded,
                    tier: Some(acquired.content.tier),
                    summary: Some(acquired.summary),
                    error: None,
                    creator_status: Some(CrawlStatus::Idle),
                }
            }
            Err(e) => {
                let message = e.to_string();
                let consecutive_failures = creator.consecutive_failures + 1;
                let status = if self.config.retry.exhausted(consecutive_failures) {
                    CrawlStatus::NeedsAttention
                } else {
                    CrawlStatus::Failed
                };
                let failure = CrawlFailure {
                    status,
                    error: message.clone(),
                    consecutive_failures,
                    next_crawl_at: self
                        .config
                        .retry
                        .next_attempt_at(consecutive_failures, finished_at),
                };
                if let Err(store_err) = self
                    .store(self.creators.record_failure(creator.id, failure))
                    .await
                {
                    error!(error = %store_err, "Failed to record crawl failure");
                }
                warn!(
                    error = %message,
                    consecutive_failures,
                    status = %status,
                    "Crawl job failed"
                );
                JobOutcome {
                    creator_id: Some(creator.id),
                    task_id: Some(task_id),
                    status: JobStatus::Failed,
                    tier: None,
                    summary: None,
                    error: Some(message),
                    creator_status: Some(status),
                }
            }
        }
    }

    /// 执行已入库任务的一次尝试并持久化状态转换
    async fn execute_task(
        &self,
        task: CrawlTask,
        request: &AcquisitionRequest,
    ) -> Result<Acquired, WorkerError> {
        let task = task.start()?;
        let task = self.store(self.tasks.update(&task)).await?;

        match self.acquire_and_persist(task.creator_id, request).await {
            Ok(acquired) => {
                let finished = task.succeed(Self::task_result(&acquired))?;
                let finished = self.store(self.tasks.update(&finished)).await?;
                // 内容已入库，任务收尾为 completed
                let completed = finished.complete()?;
                self.store(self.tasks.update(&completed)).await?;
                Ok(acquired)
            }
            Err(e) => {
                let failed = task.fail(e.to_string())?;
                if let Err(store_err) = self.store(self.tasks.update(&failed)).await {
                    error!(task_id = %failed.id, error = %store_err, "Failed to record task failure");
                }
                Err(e)
            }
        }
    }

    /// 执行临时抓取任务，失败时按剩余尝试次数退避重试
    ///
    /// 取消令牌触发时停止等待重试，任务保留在 retry 状态
    #[instrument(skip(self, task, cancel), fields(task_id = %task.id, platform = %task.platform))]
    pub async fn run_task(&self, task: CrawlTask, cancel: CancellationToken) -> Option<CrawlTask> {
        let request = AcquisitionRequest::new(
            task.platform,
            task.target_url.clone(),
            self.config.fetch_limit,
        );
        let task_id = task.id;
        let mut current = task;

        loop {
            let attempt = current.attempt_count + 1;
            match self.execute_task(current, &request).await {
                Ok(acquired) => {
                    info!(attempt, saved = acquired.summary.saved, "Ad-hoc task succeeded");
                    return self.reload_task(task_id).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Ad-hoc task attempt failed");
                }
            }

            let Some(failed) = self.reload_task(task_id).await else {
                return None;
            };
            if !failed.can_retry() {
                return Some(failed);
            }

            let retrying = match failed.retry() {
                Ok(task) => task,
                Err(e) => {
                    error!(error = %e, "Unexpected task state while scheduling retry");
                    return None;
                }
            };
            if let Err(e) = self.store(self.tasks.update(&retrying)).await {
                error!(error = %e, "Failed to persist retry state");
                return Some(retrying);
            }

            let delay = self.config.retry.calculate_backoff(attempt as u32);
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown requested, leaving task in retry state");
                    return Some(retrying);
                }
                _ = tokio::time::sleep(delay) => {}
            }
            current = retrying;
        }
    }

    async fn reload_task(&self, id: Uuid) -> Option<CrawlTask> {
        match self.store(self.tasks.find_by_id(id)).await {
            Ok(task) => task,
            Err(e) => {
                error!(task_id = %id, error = %e, "Failed to reload task");
                None
            }
        }
    }
}
