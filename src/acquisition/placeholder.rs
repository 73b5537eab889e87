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
use crate::domain::models::platform::Platform;
use crate::domain::models::raw_item::{AcquiredContent, AcquisitionTier, RawItem};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// 占位层：所有真实来源失败时生成确定性的合成条目
///
/// 同一目标总是生成相同的条目，重复抓取会被指纹去重吸收
pub struct PlaceholderStrategy;

impl PlaceholderStrategy {
    pub fn synthesize(request: &AcquisitionRequest) -> RawItem {
        let subject = request.subject();
        let digest = Sha256::digest(
            format!("{}\n{}", request.platform.as_str(), request.target_url).as_bytes(),
        );
        let origin_id = format!("placeholder-{}", &hex::encode(digest)[..16]);

        RawItem {
            origin_id: Some(origin_id),
            title: format!("{} on {}", subject, request.platform),
            body: format!(
                "No content could be acquired from {}. This entry is a synthetic placeholder.",
                request.target_url
            ),
            author: request.display_name.clone(),
            url: Some(request.target_url.clone()),
            published_at: None,
            tags: vec!["placeholder".to_string(), request.platform.to_string()],
            media_urls: Vec::new(),
        }
    }
}

#[async_trait]
impl AcquisitionStrategy for PlaceholderStrategy {
    async fn acquire(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<AcquiredContent, AcquisitionError> {
        Ok(AcquiredContent::new(
            vec![Self::synthesize(request)],
            AcquisitionTier::Placeholder,
            "placeholder",
        ))
    }

    fn tier(&self) -> AcquisitionTier {
        AcquisitionTier::Placeholder
    }

    /// 有可靠直接路径的平台在后端全部失败时应当报错，不生成合成内容
    fn applies_to(&self, platform: Platform) -> bool {
        !platform.has_reliable_direct_path()
    }
}
