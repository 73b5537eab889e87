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

use crate::engines::traits::{BackendKind, BackendPayload, EngineError, FetchResponse};
use serde::Serialize;
use std::time::{Duration, Instant};

/// 向远端抓取服务的 `/fetch` 接口提交请求
///
/// 非 2xx、超时、success:false 和空内容都转换为 `EngineError`
pub(crate) async fn post_fetch<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    base_url: &str,
    body: &B,
    timeout: Duration,
    request_url: &str,
    backend: BackendKind,
) -> Result<FetchResponse, EngineError> {
    let endpoint = format!("{}/fetch", base_url.trim_end_matches('/'));
    let start = Instant::now();

    let response = client
        .post(&endpoint)
        .json(body)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout
            } else {
                EngineError::RequestFailed(e)
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(EngineError::HttpStatus(status.as_u16()));
    }

    let payload: BackendPayload = response.json().await.map_err(|e| {
        if e.is_timeout() {
            EngineError::Timeout
        } else {
            EngineError::Other(format!("Malformed backend response: {}", e))
        }
    })?;

    FetchResponse::from_payload(
        payload,
        request_url,
        backend,
        start.elapsed().as_millis() as u64,
    )
}
