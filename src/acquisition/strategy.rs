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
use crate::domain::models::raw_item::{AcquiredContent, AcquisitionTier};
use crate::engines::traits::EngineError;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// 内容获取错误
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// 该层级未配置（例如缺少服务地址）
    #[error("{0} tier is not configured")]
    NotConfigured(&'static str),
    /// 抓取后端失败
    #[error("Fetch backends failed: {0}")]
    Engine(#[from] EngineError),
    /// 爬虫会话服务失败
    #[error("Crawler service failed: {0}")]
    Session(String),
    /// 搜索发现失败
    #[error("Search discovery failed: {0}")]
    Search(String),
    /// 层级执行成功但没有可用内容
    #[error("No content acquired: {0}")]
    NoContent(String),
    /// 所有层级都失败
    #[error("All acquisition tiers failed: {0}")]
    Exhausted(String),
}

/// 一次内容获取请求
#[derive(Debug, Clone)]
pub struct AcquisitionRequest {
    pub platform: Platform,
    /// 创作者主页或临时任务的目标地址
    pub target_url: String,
    /// 创作者显示名，临时任务为空
    pub display_name: Option<String>,
    pub limit: usize,
}

impl AcquisitionRequest {
    pub fn new(platform: Platform, target_url: impl Into<String>, limit: usize) -> Self {
        Self {
            platform,
            target_url: target_url.into(),
            display_name: None,
            limit: limit.max(1),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        let name = display_name.into();
        if !name.trim().is_empty() {
            self.display_name = Some(name);
        }
        self
    }

    /// 搜索与占位内容使用的主体名称
    ///
    /// 优先使用显示名，否则取目标地址最后一个非空路径段，再否则取主机名
    pub fn subject(&self) -> String {
        if let Some(name) = &self.display_name {
            return name.trim().to_string();
        }
        match Url::parse(&self.target_url) {
            Ok(url) => url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
                .or_else(|| url.host_str().map(str::to_string))
                .unwrap_or_else(|| self.target_url.clone()),
            Err(_) => self.target_url.clone(),
        }
    }
}

/// 获取链中的单个层级
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    /// 获取内容，成功时条目列表非空
    async fn acquire(&self, request: &AcquisitionRequest)
        -> Result<AcquiredContent, AcquisitionError>;

    /// 层级类型
    fn tier(&self) -> AcquisitionTier;

    /// 该层级是否适用于平台
    fn applies_to(&self, _platform: Platform) -> bool {
        true
    }
}

/// 平台级获取策略，由内容路由器按平台选择
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    async fn fetch(&self, request: &AcquisitionRequest)
        -> Result<AcquiredContent, AcquisitionError>;

    fn name(&self) -> &str;
}
