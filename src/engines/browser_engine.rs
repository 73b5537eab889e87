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

use crate::engines::remote::post_fetch;
use crate::engines::traits::{
    BackendKind, EngineError, FetchBackend, FetchRequest, FetchResponse,
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// 浏览器渲染后端
///
/// 调用外部浏览器自动化服务，能执行 JavaScript 并维持登录态，
/// 适用于社交平台这类重度依赖前端渲染的页面
pub struct BrowserBackend {
    client: reqwest::Client,
    base_url: String,
    default_timeout: Duration,
}

#[derive(Serialize)]
struct BrowserFetchBody<'a> {
    url: &'a str,
    /// 秒
    timeout: u64,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    headers: &'a HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_for: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    javascript: Option<&'a str>,
}

impl BrowserBackend {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, default_timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            default_timeout,
        }
    }
}

#[async_trait]
impl FetchBackend for BrowserBackend {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let body = BrowserFetchBody {
            url: &request.url,
            timeout: timeout.as_secs().max(1),
            headers: &request.headers,
            wait_for: request.wait_for.as_deref(),
            javascript: request.javascript.as_deref(),
        };

        // 服务端自己也会按 timeout 截断，客户端多留一点余量
        post_fetch(
            &self.client,
            &self.base_url,
            &body,
            timeout + Duration::from_secs(5),
            &request.url,
            BackendKind::Browser,
        )
        .await
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Browser
    }
}
