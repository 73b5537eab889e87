// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// HTTP请求处理器模块
///
/// 抓取管理接口：调度触发、任务、内容与创作者
pub mod crawler_handler;
pub mod creator_handler;
