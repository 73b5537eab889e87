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

use super::strategy::{AcquisitionError, AcquisitionRequest, AcquisitionStrategy};
use crate::domain::models::raw_item::{AcquiredContent, AcquisitionTier, RawItem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct CrawlServiceRequest<'a> {
    platform: &'a str,
    creator_url: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct CrawlServiceResponse {
    #[serde(default)]
    posts: Vec<RawItem>,
    #[serde(default)]
    total: Option<u64>,
}

/// 会话层：调用带登录态的爬虫服务 `POST {base}/crawl`
pub struct SessionStrategy {
    client: reqwest::Client,
    base_url: Option<String>,
    timeout: Duration,
}

impl SessionStrategy {
    pub fn new(client: reqwest::Client, base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            timeout,
        }
    }
}

#[async_trait]
impl AcquisitionStrategy for SessionStrategy {
    async fn acquire(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<AcquiredContent, AcquisitionError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or(AcquisitionError::NotConfigured("session"))?;

        let body = CrawlServiceRequest {
            platform: request.platform.as_str(),
            creator_url: &request.target_url,
            limit: request.limit,
        };

        let response = self
            .client
            .post(format!("{}/crawl", base_url))
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AcquisitionError::Session(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Session(format!(
                "crawler service returned HTTP {}",
                status.as_u16()
            )));
        }

        let payload: CrawlServiceResponse = response
            .json()
            .await
            .map_err(|e| AcquisitionError::Session(format!("malformed response: {}", e)))?;

        debug!(
            returned = payload.posts.len(),
            total = ?payload.total,
            "Crawler service responded"
        );

        let mut items = payload.posts;
        items.truncate(request.limit);
        if items.is_empty() {
            return Err(AcquisitionError::NoContent(
                "crawler service returned no posts".to_string(),
            ));
        }

        Ok(AcquiredContent::new(
            items,
            AcquisitionTier::Session,
            "crawler_service",
        ))
    }

    fn tier(&self) -> AcquisitionTier {
        AcquisitionTier::Session
    }
}
