// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{raw_item, Harness, HarnessOptions, ScriptedStrategy};
use chrono::{Duration as ChronoDuration, Utc};
use socialcrawl::config::settings::RetrySettings;
use socialcrawl::domain::models::crawl_task::{CrawlTask, TaskStatus};
use socialcrawl::domain::models::creator::CrawlStatus;
use socialcrawl::domain::models::platform::Platform;
use socialcrawl::domain::repositories::crawl_task_repository::CrawlTaskQuery;
use socialcrawl::domain::repositories::creator_repository::CrawlFailure;
use socialcrawl::queue::scheduler::{SchedulerError, SchedulerState, TriggerOutcome};
use socialcrawl::workers::crawl_worker::JobStatus;
use std::time::Duration;

fn items() -> Vec<socialcrawl::domain::models::raw_item::RawItem> {
    vec![
        raw_item("p1", "First post", "hello world"),
        raw_item("p2", "Second post", "another body"),
    ]
}

/// 只有满足全部到期条件的创作者会被派发
#[tokio::test]
async fn test_discovery_only_dispatches_eligible_creators() {
    let strategy = ScriptedStrategy::succeeding(items());
    let h = Harness::new(strategy.clone(), HarnessOptions::default()).await;

    let due = h.register(Platform::Weibo, "https://weibo.com/u/due", "due").await;

    let mut disabled = socialcrawl::domain::models::creator::Creator::new(
        Platform::Weibo,
        "https://weibo.com/u/disabled",
        "disabled",
        60,
    );
    disabled.auto_crawl_enabled = false;
    h.creators.create(&disabled).await.unwrap();

    let crawling = h.register(Platform::Douyin, "https://douyin.com/u/busy", "busy").await;
    assert!(h.creators.try_mark_crawling(crawling.id).await.unwrap());

    let attention = h.register(Platform::Bilibili, "https://bilibili.com/u/bad", "bad").await;
    h.creators
        .record_failure(
            attention.id,
            CrawlFailure {
                status: CrawlStatus::NeedsAttention,
                error: "too many failures".into(),
                consecutive_failures: 5,
                next_crawl_at: None,
            },
        )
        .await
        .unwrap();

    let future = h.register(Platform::Zhihu, "https://zhihu.com/people/later", "later").await;
    h.schedule_at(&future, Utc::now() + ChronoDuration::minutes(30)).await;

    let past = h.register(Platform::X, "https://x.com/past", "past").await;
    h.schedule_at(&past, Utc::now() - ChronoDuration::minutes(5)).await;

    let report = h.scheduler.discover_and_dispatch().await.unwrap();
    assert_eq!(report.eligible, 2);
    assert_eq!(report.dispatched, 2);
    assert_eq!(report.deferred, 0);
    h.wait_idle().await;

    assert_eq!(strategy.calls(), 2);
    for creator in [&due, &past] {
        let reloaded = h.reload(creator).await;
        assert_eq!(reloaded.crawl_status, CrawlStatus::Idle);
        assert!(reloaded.last_crawl_at.is_some());

        let (tasks, _) = h
            .tasks
            .query(CrawlTaskQuery {
                creator_id: Some(creator.id),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Completed);
        assert!(tasks[0].is_terminal());
    }
    assert_eq!(h.reload(&crawling).await.crawl_status, CrawlStatus::Crawling);
    assert_eq!(
        h.reload(&attention).await.crawl_status,
        CrawlStatus::NeedsAttention
    );
    assert!(h.reload(&disabled).await.last_crawl_at.is_none());
}

/// 并发作业数不超过上限，超出部分推迟到下一轮
#[tokio::test]
async fn test_concurrency_bound_defers_remaining_creators() {
    let strategy = ScriptedStrategy::slow(items(), Duration::from_millis(200));
    let h = Harness::new(
        strategy.clone(),
        HarnessOptions {
            max_concurrent_jobs: 2,
            ..Default::default()
        },
    )
    .await;

    for i in 0..5 {
        h.register(Platform::Weibo, &format!("https://weibo.com/u/{}", i), &format!("c{}", i))
            .await;
    }

    let first = h.scheduler.discover_and_dispatch().await.unwrap();
    assert_eq!(first.eligible, 5);
    assert_eq!(first.dispatched, 2);
    assert_eq!(first.deferred, 3);
    assert_eq!(first.skipped, 0);

    // 作业仍在执行时再次发现：进行中的创作者状态为 crawling，不再到期
    tokio::time::sleep(Duration::from_millis(50)).await;
    let during = h.scheduler.discover_and_dispatch().await.unwrap();
    assert_eq!(during.dispatched, 0);
    assert_eq!(during.eligible, 3);
    assert_eq!(during.deferred, 3);

    h.wait_idle().await;
    let second = h.scheduler.discover_and_dispatch().await.unwrap();
    assert_eq!(second.eligible, 3);
    assert_eq!(second.dispatched, 2);
    assert_eq!(second.deferred, 1);
    assert_eq!(
        second.eligible,
        second.dispatched + second.deferred + second.skipped
    );

    h.wait_idle().await;
    assert!(strategy.peak_concurrency() <= 2);
    assert_eq!(strategy.calls(), 4);
}

/// 成功作业写回调度字段并记录任务结果
#[tokio::test]
async fn test_successful_job_updates_schedule_and_task() {
    let strategy = ScriptedStrategy::succeeding(items());
    let h = Harness::new(strategy, HarnessOptions::default()).await;
    let creator = h.register(Platform::Weibo, "https://weibo.com/u/ok", "ok").await;

    let before = Utc::now();
    let outcome = h.worker.run_crawl_job(creator.clone()).await;
    assert_eq!(outcome.status, JobStatus::Succeeded);
    let summary = outcome.summary.unwrap();
    assert_eq!(summary.saved, 2);
    assert_eq!(summary.duplicates, 0);

    let reloaded = h.reload(&creator).await;
    assert_eq!(reloaded.crawl_status, CrawlStatus::Idle);
    assert_eq!(reloaded.consecutive_failures, 0);
    assert!(reloaded.crawl_error.is_none());
    let next = reloaded.next_crawl_at.unwrap();
    assert!(next >= before + ChronoDuration::minutes(60) - ChronoDuration::seconds(1));
    assert!(next <= Utc::now() + ChronoDuration::minutes(60));

    let task = h
        .tasks
        .find_by_id(outcome.task_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.attempt_count, 1);
    let result = task.result.unwrap();
    assert_eq!(result.title, "First post");
    assert_eq!(result.item_count, 2);
    assert_eq!(result.saved, 2);
}

/// 连续失败按退避推迟，达到阈值后进入 needs_attention
#[tokio::test]
async fn test_failures_back_off_then_need_attention() {
    let h = Harness::new(
        ScriptedStrategy::failing(),
        HarnessOptions {
            retry: RetrySettings {
                jitter: 0.0,
                max_consecutive_failures: 2,
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .await;
    let creator = h.register(Platform::Douyin, "https://douyin.com/u/flaky", "flaky").await;

    let outcome = h.worker.run_crawl_job(creator.clone()).await;
    assert_eq!(outcome.status, JobStatus::Failed);
    assert_eq!(outcome.creator_status, Some(CrawlStatus::Failed));

    let after_first = h.reload(&creator).await;
    assert_eq!(after_first.crawl_status, CrawlStatus::Failed);
    assert_eq!(after_first.consecutive_failures, 1);
    assert!(after_first.crawl_error.unwrap().contains("scripted failure"));
    assert!(after_first.next_crawl_at.unwrap() > Utc::now() + ChronoDuration::seconds(50));

    // 退避期间不再到期
    let report = h.scheduler.discover_and_dispatch().await.unwrap();
    assert_eq!(report.eligible, 0);

    let current = h.reload(&creator).await;
    h.worker.run_crawl_job(current).await;
    let after_second = h.reload(&creator).await;
    assert_eq!(after_second.crawl_status, CrawlStatus::NeedsAttention);
    assert_eq!(after_second.consecutive_failures, 2);

    let (failed_tasks, total) = h
        .tasks
        .query(CrawlTaskQuery {
            status: Some(TaskStatus::Failed),
            creator_id: Some(creator.id),
            limit: 10,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(failed_tasks.iter().all(|t| t.error_message.is_some()));
}

/// 关闭退避时失败不改变下次抓取时间，下一轮立即重试
#[tokio::test]
async fn test_failure_without_backoff_keeps_creator_due() {
    let h = Harness::new(
        ScriptedStrategy::failing(),
        HarnessOptions {
            retry: RetrySettings {
                failure_backoff_enabled: false,
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .await;
    let creator = h.register(Platform::Weibo, "https://weibo.com/u/retry", "retry").await;

    h.worker.run_crawl_job(creator.clone()).await;
    let reloaded = h.reload(&creator).await;
    assert_eq!(reloaded.crawl_status, CrawlStatus::Failed);
    assert!(reloaded.next_crawl_at.is_none());

    let report = h.scheduler.discover_and_dispatch().await.unwrap();
    assert_eq!(report.eligible, 1);
    h.wait_idle().await;
    assert_eq!(h.reload(&creator).await.consecutive_failures, 2);
}

/// 手动触发指定创作者会先恢复 needs_attention 再执行
#[tokio::test]
async fn test_trigger_resets_needs_attention_creator() {
    let strategy = ScriptedStrategy::succeeding(items());
    let h = Harness::new(strategy.clone(), HarnessOptions::default()).await;
    let creator = h.register(Platform::Weibo, "https://weibo.com/u/stuck", "stuck").await;
    h.creators
        .record_failure(
            creator.id,
            CrawlFailure {
                status: CrawlStatus::NeedsAttention,
                error: "blocked".into(),
                consecutive_failures: 5,
                next_crawl_at: None,
            },
        )
        .await
        .unwrap();

    let outcome = h.scheduler.trigger(Some(creator.id)).await.unwrap();
    match outcome {
        TriggerOutcome::Job(job) => assert_eq!(job.status, JobStatus::Succeeded),
        other => panic!("unexpected outcome: {:?}", other),
    }

    let reloaded = h.reload(&creator).await;
    assert_eq!(reloaded.crawl_status, CrawlStatus::Idle);
    assert_eq!(reloaded.consecutive_failures, 0);
    assert_eq!(h.scheduler.in_flight_count(), 0);
}

#[tokio::test]
async fn test_trigger_rejects_unknown_and_busy_creators() {
    let h = Harness::new(ScriptedStrategy::succeeding(items()), HarnessOptions::default()).await;

    let missing = uuid::Uuid::new_v4();
    assert!(matches!(
        h.scheduler.trigger(Some(missing)).await,
        Err(SchedulerError::CreatorNotFound(id)) if id == missing
    ));

    let busy = h.register(Platform::Weibo, "https://weibo.com/u/busy", "busy").await;
    h.creators.try_mark_crawling(busy.id).await.unwrap();
    assert!(matches!(
        h.scheduler.trigger(Some(busy.id)).await,
        Err(SchedulerError::CreatorBusy(_))
    ));
}

/// 第二个执行者无法取得正在抓取的创作者
#[tokio::test]
async fn test_concurrent_job_for_same_creator_is_skipped() {
    let h = Harness::new(ScriptedStrategy::succeeding(items()), HarnessOptions::default()).await;
    let creator = h.register(Platform::Weibo, "https://weibo.com/u/once", "once").await;
    h.creators.try_mark_crawling(creator.id).await.unwrap();

    let outcome = h.worker.run_crawl_job(creator.clone()).await;
    assert_eq!(outcome.status, JobStatus::Skipped);
    assert!(outcome.task_id.is_none());
    assert_eq!(h.reload(&creator).await.crawl_status, CrawlStatus::Crawling);
}

#[tokio::test]
async fn test_lifecycle_start_stop() {
    let strategy = ScriptedStrategy::slow(items(), Duration::from_millis(100));
    let h = Harness::new(strategy.clone(), HarnessOptions::default()).await;
    h.register(Platform::Weibo, "https://weibo.com/u/life", "life").await;

    // 未启动时停止只等待已提交的作业
    h.scheduler.stop().await;
    assert_eq!(h.scheduler.state(), SchedulerState::Stopped);

    h.scheduler.start().await.unwrap();
    assert_eq!(h.scheduler.state(), SchedulerState::Running);
    assert!(matches!(
        h.scheduler.start().await,
        Err(SchedulerError::AlreadyRunning)
    ));

    // 启动后立即执行第一轮发现
    tokio::time::timeout(Duration::from_secs(5), async {
        while strategy.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("first pass did not run");

    // 停止会等待进行中的作业
    h.scheduler.stop().await;
    assert_eq!(h.scheduler.state(), SchedulerState::Stopped);
    assert_eq!(h.scheduler.in_flight_count(), 0);

    let status = h.scheduler.status().await.unwrap();
    assert_eq!(status.state, SchedulerState::Stopped);
    assert_eq!(status.creators_by_status.get("idle"), Some(&1));
    assert!(status.last_pass.is_some());

    h.scheduler.stop().await;
    h.scheduler.start().await.unwrap();
    h.scheduler.stop().await;
}

/// 调度循环从未启动时，停止仍会等待手动触发的作业和临时任务结束
#[tokio::test]
async fn test_stop_without_start_drains_submitted_work() {
    let strategy = ScriptedStrategy::slow(items(), Duration::from_millis(500));
    let h = Harness::new(strategy.clone(), HarnessOptions::default()).await;
    let creator = h.register(Platform::Weibo, "https://weibo.com/u/manual", "manual").await;

    let scheduler = h.scheduler.clone();
    let creator_id = creator.id;
    let triggered = tokio::spawn(async move { scheduler.trigger(Some(creator_id)).await });

    let task = CrawlTask::new(None, Platform::General, "https://example.com/drain", 1);
    h.tasks.create(&task).await.unwrap();
    h.scheduler.spawn_task(task.clone());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.scheduler.state(), SchedulerState::Stopped);
    h.scheduler.stop().await;

    assert_eq!(h.scheduler.state(), SchedulerState::Stopped);
    assert_eq!(h.scheduler.in_flight_count(), 0);
    assert_eq!(strategy.calls(), 2);
    assert_eq!(h.reload(&creator).await.crawl_status, CrawlStatus::Idle);
    let stored = h.tasks.find_by_id(task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);

    let outcome = triggered.await.unwrap().unwrap();
    assert!(matches!(outcome, TriggerOutcome::Job(ref job) if job.status == JobStatus::Succeeded));
}

/// 停止后提交的临时任务照常执行
#[tokio::test]
async fn test_ad_hoc_task_runs_after_restart_cycle() {
    let strategy = ScriptedStrategy::succeeding(items());
    let h = Harness::new(strategy.clone(), HarnessOptions::default()).await;

    h.scheduler.start().await.unwrap();
    h.scheduler.stop().await;
    assert_eq!(h.scheduler.state(), SchedulerState::Stopped);

    let task = CrawlTask::new(None, Platform::General, "https://example.com/after", 2);
    h.tasks.create(&task).await.unwrap();

    let finished = tokio::time::timeout(Duration::from_secs(5), h.scheduler.spawn_task(task))
        .await
        .expect("task did not finish")
        .unwrap()
        .expect("task was dropped");
    assert_eq!(finished.status, TaskStatus::Completed);
    assert_eq!(finished.attempt_count, 1);
    assert_eq!(strategy.calls(), 1);

    // 再停一次仍会等待并可再次启动
    h.scheduler.stop().await;
    h.scheduler.start().await.unwrap();
    h.scheduler.stop().await;
}

/// 启动对账重置僵死的 crawling 创作者与处理中任务
#[tokio::test]
async fn test_reconcile_resets_stale_state() {
    let h = Harness::new(
        ScriptedStrategy::succeeding(items()),
        HarnessOptions {
            stale_crawling_threshold: ChronoDuration::zero(),
            ..Default::default()
        },
    )
    .await;
    let creator = h.register(Platform::Weibo, "https://weibo.com/u/stale", "stale").await;
    h.creators.try_mark_crawling(creator.id).await.unwrap();

    let task = CrawlTask::new(Some(creator.id), Platform::Weibo, "https://weibo.com/u/stale", 1);
    h.tasks.create(&task).await.unwrap();
    let task = task.start().unwrap();
    h.tasks.update(&task).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let report = h.scheduler.reconcile().await.unwrap();
    assert_eq!(report.creators_reset, 1);
    assert_eq!(report.tasks_failed, 1);

    assert_eq!(h.reload(&creator).await.crawl_status, CrawlStatus::Idle);
    let task = h.tasks.find_by_id(task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
}

/// 临时任务失败后按剩余次数重试直至成功
#[tokio::test]
async fn test_ad_hoc_task_retries_until_success() {
    let strategy = ScriptedStrategy::failing_times(1, items());
    let h = Harness::new(
        strategy.clone(),
        HarnessOptions {
            retry: RetrySettings {
                base_delay_secs: 0,
                jitter: 0.0,
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .await;

    let task = CrawlTask::new(None, Platform::General, "https://example.com/a", 3);
    h.tasks.create(&task).await.unwrap();

    let finished = h.scheduler.spawn_task(task.clone()).await.unwrap().unwrap();
    assert_eq!(finished.status, TaskStatus::Completed);
    assert_eq!(finished.attempt_count, 2);
    assert_eq!(strategy.calls(), 2);
}

#[tokio::test]
async fn test_ad_hoc_task_fails_terminally_when_attempts_exhausted() {
    let h = Harness::new(
        ScriptedStrategy::failing(),
        HarnessOptions {
            retry: RetrySettings {
                base_delay_secs: 0,
                jitter: 0.0,
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .await;

    let task = CrawlTask::new(None, Platform::General, "https://example.com/b", 2);
    h.tasks.create(&task).await.unwrap();

    let finished = h.scheduler.spawn_task(task).await.unwrap().unwrap();
    assert_eq!(finished.status, TaskStatus::Failed);
    assert_eq!(finished.attempt_count, 2);
    assert!(finished.is_terminal());
}
