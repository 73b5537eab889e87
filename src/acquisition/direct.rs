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
use crate::engines::router::FetchRouter;
use crate::engines::traits::{FetchRequest, FetchResponse};
use crate::utils::text_processing::extract_page_content;
use crate::utils::url_utils::resolve_url;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// 直接层：通过抓取路由器获取目标页面并转换为条目
pub struct DirectStrategy {
    router: Arc<FetchRouter>,
}

impl DirectStrategy {
    pub fn new(router: Arc<FetchRouter>) -> Self {
        Self { router }
    }

    /// 将抓取到的页面转换为单个条目
    ///
    /// 标题依次取后端返回的标题、页面 `<title>`、创作者名称；媒体地址解析为绝对地址
    pub fn page_to_item(response: &FetchResponse, request: &AcquisitionRequest) -> Option<RawItem> {
        let page = extract_page_content(&response.content);
        if page.text.is_empty() && page.media_urls.is_empty() {
            return None;
        }

        let base = Url::parse(&response.url).ok();
        let media_urls = page
            .media_urls
            .iter()
            .filter_map(|src| match &base {
                Some(base) => resolve_url(base, src).ok().map(|u| u.to_string()),
                None => Some(src.clone()),
            })
            .collect();

        let title = response
            .title
            .clone()
            .or(page.title)
            .unwrap_or_else(|| request.subject());

        Some(RawItem {
            origin_id: None,
            title,
            body: page.text,
            author: request.display_name.clone(),
            url: Some(response.url.clone()),
            published_at: None,
            tags: Vec::new(),
            media_urls,
        })
    }
}

#[async_trait]
impl AcquisitionStrategy for DirectStrategy {
    async fn acquire(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<AcquiredContent, AcquisitionError> {
        if !self.router.has_backends() {
            return Err(AcquisitionError::NotConfigured("direct"));
        }

        let fetch_request = FetchRequest::new(&request.target_url, request.platform);
        let response = self.router.route(&fetch_request).await?;

        let item = Self::page_to_item(&response, request).ok_or_else(|| {
            AcquisitionError::NoContent(format!("page {} has no readable content", response.url))
        })?;

        Ok(AcquiredContent::new(
            vec![item],
            AcquisitionTier::Direct,
            response.backend.as_str(),
        ))
    }

    fn tier(&self) -> AcquisitionTier {
        AcquisitionTier::Direct
    }
}
