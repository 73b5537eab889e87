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

/// 内容获取模块
///
/// 会话、直接抓取、搜索发现、合成占位四个层级组成获取链，
/// 内容路由器按平台选择获取策略
pub mod chain;
pub mod direct;
pub mod discovery;
pub mod placeholder;
pub mod registry;
pub mod session;
pub mod strategy;

pub use chain::AcquisitionChain;
pub use registry::ContentRouter;
pub use strategy::{AcquisitionError, AcquisitionRequest, AcquisitionStrategy, FetchStrategy};

use crate::config::settings::Settings;
use crate::domain::search::engine::SearchEngine;
use crate::engines::router::FetchRouter;
use std::sync::Arc;

/// 按配置组装默认获取链，并作为内容路由器的默认策略
pub fn build_content_router(
    settings: &Settings,
    client: reqwest::Client,
    fetch_router: Arc<FetchRouter>,
    search_engines: Vec<Arc<dyn SearchEngine>>,
) -> ContentRouter {
    let mut tiers: Vec<Arc<dyn AcquisitionStrategy>> = vec![
        Arc::new(session::SessionStrategy::new(
            client,
            settings.fetch.crawler_service.base_url.clone(),
            settings.fetch.crawler_service.timeout(),
        )),
        Arc::new(direct::DirectStrategy::new(fetch_router)),
    ];

    if settings.discovery.enabled {
        tiers.push(Arc::new(discovery::DiscoveryStrategy::new(
            search_engines,
            settings.discovery.max_results,
            settings.discovery.title_similarity_threshold,
        )));
    }
    if settings.placeholder.enabled {
        tiers.push(Arc::new(placeholder::PlaceholderStrategy));
    }

    ContentRouter::new(Arc::new(AcquisitionChain::new("default", tiers)))
}
