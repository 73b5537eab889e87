// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SchedulerSettings;
use crate::domain::models::crawl_task::CrawlTask;
use crate::domain::models::creator::{CrawlStatus, Creator};
use crate::domain::repositories::crawl_task_repository::{CrawlTaskRepository, RepositoryError};
use crate::domain::repositories::creator_repository::CreatorRepository;
use crate::workers::crawl_worker::{CrawlWorker, JobOutcome};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use metrics::gauge;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 调度器错误类型
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Scheduler is already running")]
    AlreadyRunning,
    #[error("Scheduler is stopping")]
    Stopping,
    #[error("Creator {0} not found")]
    CreatorNotFound(Uuid),
    #[error("Creator {0} is already being crawled")]
    CreatorBusy(Uuid),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("Crawl job aborted: {0}")]
    Join(String),
}

/// 调度器生命周期状态
///
/// Stopped → Running → Stopping → Stopped，未启动时 stop 直接经 Stopping 回到 Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Stopped,
    Running,
    Stopping,
}

/// 一轮发现的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    /// 到期的创作者数量
    pub eligible: usize,
    /// 本轮派发的作业数量
    pub dispatched: usize,
    /// 因并发已满推迟到下一轮的数量
    pub deferred: usize,
    /// 已在执行中而跳过的数量
    pub skipped: usize,
}

/// 启动对账结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub creators_reset: u64,
    pub tasks_failed: u64,
}

/// 手动触发结果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerOutcome {
    Discovery(DiscoveryReport),
    Job(JobOutcome),
}

/// 最近一轮发现
#[derive(Debug, Clone, Serialize)]
pub struct PassRecord {
    pub finished_at: DateTime<Utc>,
    pub report: DiscoveryReport,
}

/// 调度器状态快照
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub started_at: Option<DateTime<Utc>>,
    pub in_flight_jobs: usize,
    pub in_flight_creators: Vec<Uuid>,
    pub max_concurrent_jobs: usize,
    pub tick_interval_secs: u64,
    pub last_pass: Option<PassRecord>,
    pub creators_by_status: HashMap<String, u64>,
}

/// 调度器参数
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    pub max_concurrent_jobs: usize,
    pub store_timeout: Duration,
    pub stale_crawling_threshold: chrono::Duration,
}

impl SchedulerConfig {
    pub fn from_settings(settings: &SchedulerSettings) -> Self {
        Self {
            tick_interval: settings.tick_interval(),
            max_concurrent_jobs: settings.max_concurrent_jobs.max(1),
            store_timeout: settings.store_timeout(),
            stale_crawling_threshold: chrono::Duration::minutes(
                settings.stale_crawling_threshold_mins.max(0),
            ),
        }
    }
}

struct Lifecycle {
    state: SchedulerState,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    started_at: Option<DateTime<Utc>>,
}

/// 从进行中集合移除创作者，作业以任何方式结束时都会执行
struct InFlightGuard {
    in_flight: Arc<DashMap<Uuid, DateTime<Utc>>>,
    creator_id: Uuid,
}

impl InFlightGuard {
    fn register(in_flight: &Arc<DashMap<Uuid, DateTime<Utc>>>, creator_id: Uuid) -> Option<Self> {
        use dashmap::mapref::entry::Entry;

        match in_flight.entry(creator_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                gauge!("scheduler_in_flight_jobs").set(in_flight.len() as f64);
                Some(Self {
                    in_flight: in_flight.clone(),
                    creator_id,
                })
            }
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.creator_id);
        gauge!("scheduler_in_flight_jobs").set(self.in_flight.len() as f64);
    }
}

/// 许可耗尽后统计本轮剩余的创作者，返回 (推迟数, 跳过数)
///
/// 已在执行中的创作者计为跳过，其余留待下一轮
fn count_remaining(
    rest: impl Iterator<Item = Uuid>,
    in_flight: &DashMap<Uuid, DateTime<Utc>>,
) -> (usize, usize) {
    rest.fold((0, 0), |(deferred, skipped), id| {
        if in_flight.contains_key(&id) {
            (deferred, skipped + 1)
        } else {
            (deferred + 1, skipped)
        }
    })
}

/// 抓取调度器
///
/// 定时发现到期的创作者，在有界并发下派发抓取作业。
/// 一轮发现不会等待空闲许可，许可不足时剩余创作者留待下一轮
pub struct CrawlScheduler {
    creators: Arc<dyn CreatorRepository>,
    tasks: Arc<dyn CrawlTaskRepository>,
    worker: Arc<CrawlWorker>,
    config: SchedulerConfig,
    permits: Arc<Semaphore>,
    in_flight: Arc<DashMap<Uuid, DateTime<Utc>>>,
    tracker: TaskTracker,
    pass_lock: tokio::sync::Mutex<()>,
    lifecycle: Mutex<Lifecycle>,
    last_pass: Mutex<Option<PassRecord>>,
}

impl CrawlScheduler {
    pub fn new(
        creators: Arc<dyn CreatorRepository>,
        tasks: Arc<dyn CrawlTaskRepository>,
        worker: Arc<CrawlWorker>,
        config: SchedulerConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self {
            creators,
            tasks,
            worker,
            config,
            permits,
            in_flight: Arc::new(DashMap::new()),
            tracker: TaskTracker::new(),
            pass_lock: tokio::sync::Mutex::new(()),
            lifecycle: Mutex::new(Lifecycle {
                state: SchedulerState::Stopped,
                cancel: CancellationToken::new(),
                handle: None,
                started_at: None,
            }),
            last_pass: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.lifecycle.lock().state
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// 当前正在抓取的创作者数量
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    async fn store<T, F>(&self, fut: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        tokio::time::timeout(self.config.store_timeout, fut)
            .await
            .map_err(|_| RepositoryError::Timeout(self.config.store_timeout))?
    }

    /// 启动调度循环
    ///
    /// 先执行启动对账，然后立即进行第一轮发现，之后按周期重复
    pub async fn start(self: &Arc<Self>) -> Result<ReconcileReport, SchedulerError> {
        match self.state() {
            SchedulerState::Running => return Err(SchedulerError::AlreadyRunning),
            SchedulerState::Stopping => return Err(SchedulerError::Stopping),
            SchedulerState::Stopped => {}
        }

        let reconciled = match self.reconcile().await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Startup reconciliation failed, continuing");
                ReconcileReport::default()
            }
        };

        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            SchedulerState::Running => return Err(SchedulerError::AlreadyRunning),
            SchedulerState::Stopping => return Err(SchedulerError::Stopping),
            SchedulerState::Stopped => {}
        }

        let cancel = CancellationToken::new();
        self.tracker.reopen();
        let handle = tokio::spawn(self.clone().run_loop(cancel.clone()));

        lifecycle.state = SchedulerState::Running;
        lifecycle.cancel = cancel;
        lifecycle.handle = Some(handle);
        lifecycle.started_at = Some(Utc::now());

        info!(
            tick_interval = ?self.config.tick_interval,
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "Crawl scheduler started"
        );
        Ok(reconciled)
    }

    /// 停止调度循环并等待所有已派发作业结束
    ///
    /// 未启动过循环时同样会取消并等待手动触发的作业和临时任务。
    /// 结束后换上新的取消令牌，之后提交的临时任务可以正常执行
    pub async fn stop(&self) {
        let stopping = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state == SchedulerState::Stopping {
                None
            } else {
                lifecycle.state = SchedulerState::Stopping;
                Some((lifecycle.handle.take(), lifecycle.cancel.clone()))
            }
        };
        let Some((handle, cancel)) = stopping else {
            // 另一次 stop 正在进行，只等待作业结束
            self.tracker.wait().await;
            return;
        };

        info!(in_flight = self.tracker.len(), "Stopping crawl scheduler");
        cancel.cancel();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler loop terminated abnormally");
            }
        }

        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();

        let mut lifecycle = self.lifecycle.lock();
        lifecycle.state = SchedulerState::Stopped;
        lifecycle.cancel = CancellationToken::new();
        lifecycle.started_at = None;
        info!("Crawl scheduler stopped");
    }

    async fn run_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.discover_and_dispatch().await {
                        error!(error = %e, "Discovery pass failed");
                    }
                }
            }
        }
        debug!("Scheduler loop exited");
    }

    /// 执行一轮发现并派发到期的创作者
    ///
    /// 与定时循环和手动触发互斥
    #[instrument(skip(self))]
    pub async fn discover_and_dispatch(&self) -> Result<DiscoveryReport, SchedulerError> {
        let _pass = self.pass_lock.lock().await;

        let due = self.store(self.creators.find_due(Utc::now())).await?;
        let mut report = DiscoveryReport {
            eligible: due.len(),
            ..Default::default()
        };

        let mut pending = due.into_iter();
        while let Some(creator) = pending.next() {
            if self.in_flight.contains_key(&creator.id) {
                report.skipped += 1;
                continue;
            }

            let permit = match self.permits.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    let (deferred, skipped) =
                        count_remaining(pending.by_ref().map(|c| c.id), &self.in_flight);
                    report.deferred = 1 + deferred;
                    report.skipped += skipped;
                    break;
                }
            };

            match InFlightGuard::register(&self.in_flight, creator.id) {
                Some(guard) => {
                    self.dispatch(creator, permit, guard);
                    report.dispatched += 1;
                }
                None => report.skipped += 1,
            }
        }

        if report.eligible > 0 {
            info!(
                eligible = report.eligible,
                dispatched = report.dispatched,
                deferred = report.deferred,
                skipped = report.skipped,
                "Discovery pass finished"
            );
        } else {
            debug!("No creators due");
        }

        *self.last_pass.lock() = Some(PassRecord {
            finished_at: Utc::now(),
            report,
        });
        Ok(report)
    }

    fn dispatch(
        &self,
        creator: Creator,
        permit: OwnedSemaphorePermit,
        guard: InFlightGuard,
    ) -> JoinHandle<JobOutcome> {
        let worker = self.worker.clone();
        self.tracker.spawn(async move {
            let _permit = permit;
            let _guard = guard;
            worker.run_crawl_job(creator).await
        })
    }

    /// 手动触发
    ///
    /// 不带创作者时立即执行一轮发现；带创作者时先把 failed/needs_attention
    /// 恢复为 idle，再等待空闲许可执行该创作者的作业并返回结果
    #[instrument(skip(self))]
    pub async fn trigger(&self, creator_id: Option<Uuid>) -> Result<TriggerOutcome, SchedulerError> {
        if self.state() == SchedulerState::Stopping {
            return Err(SchedulerError::Stopping);
        }

        let Some(creator_id) = creator_id else {
            return Ok(TriggerOutcome::Discovery(self.discover_and_dispatch().await?));
        };

        let creator = self
            .store(self.creators.find_by_id(creator_id))
            .await?
            .ok_or(SchedulerError::CreatorNotFound(creator_id))?;
        if creator.crawl_status == CrawlStatus::Crawling || self.in_flight.contains_key(&creator_id)
        {
            return Err(SchedulerError::CreatorBusy(creator_id));
        }

        if matches!(
            creator.crawl_status,
            CrawlStatus::Failed | CrawlStatus::NeedsAttention
        ) && self.store(self.creators.reset_for_retry(creator_id)).await?
        {
            info!(%creator_id, previous = %creator.crawl_status, "Creator reset for manual retry");
        }

        let creator = self
            .store(self.creators.find_by_id(creator_id))
            .await?
            .ok_or(SchedulerError::CreatorNotFound(creator_id))?;

        let guard = InFlightGuard::register(&self.in_flight, creator_id)
            .ok_or(SchedulerError::CreatorBusy(creator_id))?;
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SchedulerError::Join(e.to_string()))?;

        let outcome = self
            .dispatch(creator, permit, guard)
            .await
            .map_err(|e| SchedulerError::Join(e.to_string()))?;
        Ok(TriggerOutcome::Job(outcome))
    }

    /// 启动对账
    ///
    /// 重置长时间停留在 crawling 的创作者，并把同样过期的处理中任务标记为失败
    pub async fn reconcile(&self) -> Result<ReconcileReport, SchedulerError> {
        let older_than = Utc::now() - self.config.stale_crawling_threshold;

        let creators_reset = self
            .store(self.creators.reset_stale_crawling(older_than))
            .await?;
        let tasks_failed = self
            .store(
                self.tasks
                    .fail_stale_processing(older_than, "interrupted before completion"),
            )
            .await?;

        if creators_reset > 0 || tasks_failed > 0 {
            warn!(creators_reset, tasks_failed, "Reconciled stale crawl state");
        }
        Ok(ReconcileReport {
            creators_reset,
            tasks_failed,
        })
    }

    /// 后台执行临时任务
    ///
    /// 与定时作业共享并发许可，调度器停止时会等待其结束
    pub fn spawn_task(&self, task: CrawlTask) -> JoinHandle<Option<CrawlTask>> {
        let worker = self.worker.clone();
        let permits = self.permits.clone();
        let cancel = self.lifecycle.lock().cancel.clone();

        self.tracker.spawn(async move {
            let _permit = tokio::select! {
                _ = cancel.cancelled() => return None,
                permit = permits.acquire_owned() => permit.ok()?,
            };
            worker.run_task(task, cancel).await
        })
    }

    /// 当前状态快照
    pub async fn status(&self) -> Result<SchedulerStatus, SchedulerError> {
        let counts = self.store(self.creators.count_by_status()).await?;
        let (state, started_at) = {
            let lifecycle = self.lifecycle.lock();
            (lifecycle.state, lifecycle.started_at)
        };

        Ok(SchedulerStatus {
            state,
            started_at,
            in_flight_jobs: self.in_flight.len(),
            in_flight_creators: self.in_flight.iter().map(|entry| *entry.key()).collect(),
            max_concurrent_jobs: self.config.max_concurrent_jobs,
            tick_interval_secs: self.config.tick_interval.as_secs(),
            last_pass: self.last_pass.lock().clone(),
            creators_by_status: counts
                .into_iter()
                .map(|(status, count)| (status.to_string(), count))
                .collect(),
        })
    }
}
