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

use super::strategy::{AcquisitionError, AcquisitionRequest, FetchStrategy};
use crate::domain::models::platform::Platform;
use crate::domain::models::raw_item::AcquiredContent;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// 内容路由器
///
/// 平台到获取策略的注册表，未注册的平台使用默认策略
pub struct ContentRouter {
    strategies: HashMap<Platform, Arc<dyn FetchStrategy>>,
    default_strategy: Arc<dyn FetchStrategy>,
}

impl ContentRouter {
    pub fn new(default_strategy: Arc<dyn FetchStrategy>) -> Self {
        Self {
            strategies: HashMap::new(),
            default_strategy,
        }
    }

    /// 为平台注册专用策略，覆盖已有注册
    pub fn register(mut self, platform: Platform, strategy: Arc<dyn FetchStrategy>) -> Self {
        self.strategies.insert(platform, strategy);
        self
    }

    pub fn strategy_for(&self, platform: Platform) -> Arc<dyn FetchStrategy> {
        self.strategies
            .get(&platform)
            .cloned()
            .unwrap_or_else(|| self.default_strategy.clone())
    }

    /// 获取内容
    #[instrument(skip(self, request), fields(platform = %request.platform, url = %request.target_url))]
    pub async fn acquire(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<AcquiredContent, AcquisitionError> {
        let strategy = self.strategy_for(request.platform);
        debug!(strategy = strategy.name(), "Dispatching acquisition");
        strategy.fetch(request).await
    }
}
