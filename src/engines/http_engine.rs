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

/// 轻量 HTTP 抓取后端
///
/// 外部服务只做简单 GET 与请求头伪装，速度快但无法渲染脚本
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    default_timeout: Duration,
}

#[derive(Serialize)]
struct HttpFetchBody<'a> {
    url: &'a str,
    /// 秒
    timeout: u64,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    headers: &'a HashMap<String, String>,
    follow_redirects: bool,
}

impl HttpBackend {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, default_timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            default_timeout,
        }
    }
}

#[async_trait]
impl FetchBackend for HttpBackend {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let body = HttpFetchBody {
            url: &request.url,
            timeout: timeout.as_secs().max(1),
            headers: &request.headers,
            follow_redirects: request.follow_redirects,
        };

        post_fetch(
            &self.client,
            &self.base_url,
            &body,
            timeout,
            &request.url,
            BackendKind::Http,
        )
        .await
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Http
    }
}

#[cfg(test)]
#[path = "http_engine_test.rs"]
mod tests;
