// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{raw_item, Harness, HarnessOptions, ScriptedStrategy};
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use socialcrawl::config::settings::Settings;
use std::time::Duration;
use uuid::Uuid;

async fn harness(strategy: std::sync::Arc<ScriptedStrategy>) -> (Harness, TestServer) {
    let h = Harness::new(strategy, HarnessOptions::default()).await;
    let server = h.server(Settings::default());
    (h, server)
}

fn succeeding() -> std::sync::Arc<ScriptedStrategy> {
    ScriptedStrategy::succeeding(vec![raw_item("p1", "标题", "正文内容")])
}

async fn register_creator(server: &TestServer, url: &str) -> Value {
    let response = server
        .post("/crawler/creators")
        .json(&json!({
            "platform": "weibo",
            "profile_url": url,
            "display_name": "测试博主",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

/// 轮询任务直到进入终态：completed，或尝试次数耗尽的 failed
async fn wait_for_task(server: &TestServer, id: &str) -> Value {
    for _ in 0..200 {
        let task = server
            .get(&format!("/crawler/tasks/{}", id))
            .await
            .json::<Value>();
        let settled = match task["status"].as_str() {
            Some("completed") => true,
            Some("failed") => task["attempt_count"].as_u64() >= task["max_attempts"].as_u64(),
            _ => false,
        };
        if settled {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("task {} did not settle", id);
}

#[tokio::test]
async fn test_health_and_version() {
    let (_h, server) = harness(succeeding()).await;

    let health = server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.text(), "OK");

    let version = server.get("/version").await.json::<Value>();
    assert_eq!(version["name"], "socialcrawl");
    assert!(version["version"].as_str().is_some());
}

#[tokio::test]
async fn test_create_and_list_creators() {
    let (_h, server) = harness(succeeding()).await;

    let created = register_creator(&server, "https://weibo.com/u/1001").await;
    assert_eq!(created["platform"], "weibo");
    assert_eq!(created["crawl_status"], "idle");
    assert_eq!(created["crawl_interval"], 60);
    assert_eq!(created["auto_crawl_enabled"], true);

    let custom = server
        .post("/crawler/creators")
        .json(&json!({
            "platform": "bilibili",
            "profile_url": "https://space.bilibili.com/42",
            "display_name": "up主",
            "crawl_interval": 15,
            "auto_crawl_enabled": false,
        }))
        .await;
    assert_eq!(custom.status_code(), StatusCode::CREATED);
    assert_eq!(custom.json::<Value>()["crawl_interval"], 15);

    let page = server.get("/crawler/creators").await.json::<Value>();
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(page["has_more"], false);

    let first = server
        .get("/crawler/creators")
        .add_query_param("limit", 1)
        .await
        .json::<Value>();
    assert_eq!(first["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(first["has_more"], true);
}

#[tokio::test]
async fn test_create_creator_rejects_invalid_input() {
    let (_h, server) = harness(succeeding()).await;

    let bad_url = server
        .post("/crawler/creators")
        .json(&json!({
            "platform": "weibo",
            "profile_url": "not a url",
            "display_name": "x",
        }))
        .await;
    assert_eq!(bad_url.status_code(), StatusCode::BAD_REQUEST);
    assert!(bad_url.json::<Value>()["error"].is_string());

    let bad_platform = server
        .post("/crawler/creators")
        .json(&json!({
            "platform": "myspace",
            "profile_url": "https://myspace.com/tom",
            "display_name": "tom",
        }))
        .await;
    assert_eq!(bad_platform.status_code(), StatusCode::BAD_REQUEST);

    let bad_interval = server
        .post("/crawler/creators")
        .json(&json!({
            "platform": "weibo",
            "profile_url": "https://weibo.com/u/1",
            "display_name": "x",
            "crawl_interval": 0,
        }))
        .await;
    assert_eq!(bad_interval.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trigger_single_creator_runs_job() {
    let strategy = succeeding();
    let (_h, server) = harness(strategy.clone()).await;
    let creator = register_creator(&server, "https://weibo.com/u/1001").await;

    let response = server
        .post("/crawler/trigger")
        .json(&json!({ "creator_id": creator["id"] }))
        .await;
    response.assert_status_ok();
    let outcome = response.json::<Value>();
    assert_eq!(outcome["kind"], "job");
    assert_eq!(outcome["status"], "succeeded");
    assert_eq!(outcome["summary"]["saved"], 1);
    assert_eq!(strategy.calls(), 1);

    let contents = server
        .get("/crawler/contents")
        .add_query_param("creator_id", creator["id"].as_str().unwrap())
        .await
        .json::<Value>();
    assert_eq!(contents["total"], 1);
    assert_eq!(contents["items"][0]["title"], "标题");
}

#[tokio::test]
async fn test_trigger_without_body_runs_discovery_pass() {
    let (h, server) = harness(succeeding()).await;
    register_creator(&server, "https://weibo.com/u/1").await;
    register_creator(&server, "https://weibo.com/u/2").await;

    let response = server.post("/crawler/trigger").await;
    response.assert_status_ok();
    let outcome = response.json::<Value>();
    assert_eq!(outcome["kind"], "discovery");
    assert_eq!(outcome["eligible"], 2);
    assert_eq!(outcome["dispatched"], 2);
    h.wait_idle().await;
}

#[tokio::test]
async fn test_trigger_unknown_creator_is_not_found() {
    let (_h, server) = harness(succeeding()).await;

    let response = server
        .post("/crawler/trigger")
        .json(&json!({ "creator_id": Uuid::new_v4() }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let malformed = server
        .post("/crawler/trigger")
        .text("{not json")
        .await;
    assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_adhoc_task_lifecycle() {
    let (_h, server) = harness(succeeding()).await;

    let response = server
        .post("/crawler/tasks")
        .json(&json!({
            "platform": "zhihu",
            "url": "https://www.zhihu.com/people/someone",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let task = response.json::<Value>();
    let id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["creator_id"], Value::Null);

    let settled = wait_for_task(&server, &id).await;
    assert_eq!(settled["status"], "completed");
    assert_eq!(settled["attempt_count"], 1);
    assert_eq!(settled["result"]["saved"], 1);

    let again = server
        .put(&format!("/crawler/tasks/{}/status", id))
        .json(&json!({ "status": "completed" }))
        .await;
    assert_eq!(again.status_code(), StatusCode::CONFLICT);

    let illegal = server
        .put(&format!("/crawler/tasks/{}/status", id))
        .json(&json!({ "status": "processing" }))
        .await;
    assert_eq!(illegal.status_code(), StatusCode::CONFLICT);

    let listed = server
        .get("/crawler/tasks")
        .add_query_param("status", "completed")
        .await
        .json::<Value>();
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0]["id"], id.as_str());
}

#[tokio::test]
async fn test_failed_adhoc_task_records_error() {
    let (_h, server) = harness(ScriptedStrategy::failing()).await;

    let task = server
        .post("/crawler/tasks")
        .json(&json!({
            "platform": "weibo",
            "url": "https://weibo.com/u/404",
            "max_attempts": 1,
        }))
        .await
        .json::<Value>();
    let id = task["id"].as_str().unwrap().to_string();

    let settled = wait_for_task(&server, &id).await;
    assert_eq!(settled["status"], "failed");
    assert!(settled["error_message"]
        .as_str()
        .is_some_and(|e| e.contains("scripted failure")));

    let retry = server
        .put(&format!("/crawler/tasks/{}/status", id))
        .json(&json!({ "status": "retry" }))
        .await;
    assert_eq!(retry.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let (_h, server) = harness(succeeding()).await;
    let id = Uuid::new_v4();

    let get = server.get(&format!("/crawler/tasks/{}", id)).await;
    assert_eq!(get.status_code(), StatusCode::NOT_FOUND);

    let put = server
        .put(&format!("/crawler/tasks/{}/status", id))
        .json(&json!({ "status": "completed" }))
        .await;
    assert_eq!(put.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_task_request_is_rejected() {
    let (_h, server) = harness(succeeding()).await;

    let response = server
        .post("/crawler/tasks")
        .json(&json!({ "platform": "weibo", "url": "weibo" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let too_many = server
        .post("/crawler/tasks")
        .json(&json!({
            "platform": "weibo",
            "url": "https://weibo.com/u/1",
            "max_attempts": 50,
        }))
        .await;
    assert_eq!(too_many.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_reports_scheduler_and_config() {
    let (h, server) = harness(succeeding()).await;
    register_creator(&server, "https://weibo.com/u/1").await;

    let status = server.get("/crawler/status").await.json::<Value>();
    assert_eq!(status["scheduler"]["state"], "stopped");
    assert_eq!(status["scheduler"]["in_flight_jobs"], 0);
    assert_eq!(status["scheduler"]["max_concurrent_jobs"], 3);
    assert_eq!(status["scheduler"]["creators_by_status"]["idle"], 1);
    assert_eq!(status["config"]["failure_backoff_enabled"], true);
    assert!(status["backends"].is_object());

    h.scheduler.start().await.unwrap();
    let running = server.get("/crawler/status").await.json::<Value>();
    assert_eq!(running["scheduler"]["state"], "running");
    h.scheduler.stop().await;
}

#[tokio::test]
async fn test_contents_filter_by_platform() {
    let (_h, server) = harness(succeeding()).await;

    for (platform, url) in [
        ("weibo", "https://weibo.com/u/1"),
        ("zhihu", "https://www.zhihu.com/people/a"),
    ] {
        let task = server
            .post("/crawler/tasks")
            .json(&json!({ "platform": platform, "url": url }))
            .await
            .json::<Value>();
        wait_for_task(&server, task["id"].as_str().unwrap()).await;
    }

    let weibo = server
        .get("/crawler/contents")
        .add_query_param("platform", "weibo")
        .await
        .json::<Value>();
    assert_eq!(weibo["total"], 1);
    assert_eq!(weibo["items"][0]["platform"], "weibo");

    let unknown = server
        .get("/crawler/contents")
        .add_query_param("platform", "myspace")
        .await;
    assert_eq!(unknown.status_code(), StatusCode::BAD_REQUEST);
}
