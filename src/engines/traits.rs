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

use crate::domain::models::platform::Platform;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 后端返回非 2xx 状态码
    #[error("Backend returned HTTP {0}")]
    HttpStatus(u16),
    /// 后端明确返回 success:false
    #[error("Backend reported failure: {0}")]
    Backend(String),
    /// 后端返回成功但内容为空
    #[error("Backend returned empty content")]
    EmptyContent,
    /// 所有引擎都失败
    #[error("All engines failed")]
    AllEnginesFailed,
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl EngineError {
    /// 判断错误是否属于后端不可用一类
    ///
    /// 仅这类错误计入熔断器，内容层面的失败不会熔断后端
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::RequestFailed(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            EngineError::HttpStatus(code) => *code >= 500 || *code == 429,
            EngineError::Timeout => true,
            _ => false,
        }
    }
}

/// 后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// 重量级浏览器渲染服务
    Browser,
    /// 轻量 HTTP 抓取服务
    Http,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Browser => "browser",
            BackendKind::Http => "http",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" | "playwright" | "heavy" => Ok(BackendKind::Browser),
            "http" | "reqwest" | "light" => Ok(BackendKind::Http),
            other => Err(format!("unknown fetch backend: {}", other)),
        }
    }
}

/// 抓取请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 目标URL
    pub url: String,
    /// 所属平台
    pub platform: Platform,
    /// 请求头
    pub headers: HashMap<String, String>,
    /// 超时时间，为空时使用后端默认值
    pub timeout: Option<Duration>,
    /// 浏览器后端：等待出现的选择器
    pub wait_for: Option<String>,
    /// 浏览器后端：页面加载后执行的脚本
    pub javascript: Option<String>,
    /// HTTP 后端：是否跟随重定向
    pub follow_redirects: bool,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, platform: Platform) -> Self {
        Self {
            url: url.into(),
            platform,
            headers: HashMap::new(),
            timeout: None,
            wait_for: None,
            javascript: None,
            follow_redirects: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// 后端服务的统一响应体
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendPayload {
    #[serde(default)]
    pub success: bool,
    pub content: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub error: Option<String>,
}

/// 抓取响应
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// 页面内容
    pub content: String,
    /// 页面标题
    pub title: Option<String>,
    /// 最终地址
    pub url: String,
    /// 实际处理请求的后端
    pub backend: BackendKind,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

impl FetchResponse {
    /// 校验后端响应体并转换为抓取响应
    ///
    /// success:false 与空内容都视为该后端失败
    pub fn from_payload(
        payload: BackendPayload,
        request_url: &str,
        backend: BackendKind,
        response_time_ms: u64,
    ) -> Result<Self, EngineError> {
        if !payload.success {
            return Err(EngineError::Backend(
                payload
                    .error
                    .unwrap_or_else(|| "success=false without error".to_string()),
            ));
        }

        let content = payload.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(EngineError::EmptyContent);
        }

        Ok(Self {
            content,
            title: payload.title.filter(|t| !t.trim().is_empty()),
            url: payload.url.unwrap_or_else(|| request_url.to_string()),
            backend,
            response_time_ms,
        })
    }
}

/// 抓取后端特质
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// 执行抓取
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError>;

    /// 后端类型
    fn kind(&self) -> BackendKind;

    /// 后端名称，用于熔断与统计
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}
