// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 搜索服务模块
///
/// 提供 Bing、百度、搜狗搜索引擎的客户端实现，
/// 供没有可靠直接抓取路径的平台做降级发现
pub mod anchors;
pub mod baidu;
pub mod bing;
pub mod factory;
pub mod pacing;
pub mod sogou;

pub use factory::build_search_engines;
