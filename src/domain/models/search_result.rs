// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 搜索引擎返回的单条结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    /// 产生该结果的搜索引擎
    pub engine: String,
}

impl SearchResult {
    pub fn new(title: String, url: String, description: Option<String>, engine: &str) -> Self {
        Self {
            title,
            url,
            description,
            engine: engine.to_string(),
        }
    }
}
