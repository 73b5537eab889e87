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

use super::strategy::{AcquisitionError, AcquisitionRequest, AcquisitionStrategy, FetchStrategy};
use crate::domain::models::raw_item::AcquiredContent;
use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 分层获取链
///
/// 按顺序尝试适用于平台的各层级，返回第一个非空结果；
/// 全部失败时汇总各层级错误
pub struct AcquisitionChain {
    name: String,
    tiers: Vec<Arc<dyn AcquisitionStrategy>>,
}

impl AcquisitionChain {
    pub fn new(name: impl Into<String>, tiers: Vec<Arc<dyn AcquisitionStrategy>>) -> Self {
        Self {
            name: name.into(),
            tiers,
        }
    }

    /// 层级名称，按尝试顺序
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.tier().as_str()).collect()
    }
}

#[async_trait]
impl FetchStrategy for AcquisitionChain {
    async fn fetch(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<AcquiredContent, AcquisitionError> {
        let mut failures = Vec::new();

        for tier in &self.tiers {
            let tier_name = tier.tier().as_str();
            if !tier.applies_to(request.platform) {
                debug!(tier = tier_name, platform = %request.platform, "Tier not applicable, skipping");
                continue;
            }

            match tier.acquire(request).await {
                Ok(content) if !content.items.is_empty() => {
                    counter!("acquisition_tier_total", "tier" => tier_name).increment(1);
                    info!(
                        tier = tier_name,
                        source = %content.source,
                        items = content.items.len(),
                        url = %request.target_url,
                        "Content acquired"
                    );
                    return Ok(content);
                }
                Ok(_) => {
                    warn!(tier = tier_name, url = %request.target_url, "Tier returned no items");
                    failures.push(format!("{}: no items", tier_name));
                }
                Err(AcquisitionError::NotConfigured(_)) => {
                    debug!(tier = tier_name, "Tier not configured, skipping");
                }
                Err(e) => {
                    warn!(tier = tier_name, url = %request.target_url, error = %e, "Tier failed, trying next");
                    failures.push(format!("{}: {}", tier_name, e));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no applicable tier".to_string());
        }
        Err(AcquisitionError::Exhausted(failures.join("; ")))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
