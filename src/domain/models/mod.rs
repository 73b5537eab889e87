// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 平台（platform）：创作者所在的社交媒体平台及其抓取特征
/// - 创作者（creator）：被周期性抓取的账号及其调度状态
/// - 抓取任务（crawl_task）：一次抓取尝试及其状态机
/// - 内容（post）：规范化去重后的持久化内容
/// - 原始条目（raw_item）：各获取层级返回的未加工数据
/// - 搜索结果（search_result）：搜索引擎发现阶段的中间结果
pub mod crawl_task;
pub mod creator;
pub mod platform;
pub mod post;
pub mod raw_item;
pub mod search_result;
