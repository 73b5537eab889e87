// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 创作者仓库（creator_repository）：调度状态的条件更新与到期查询
/// - 内容仓库（post_repository）：去重检查与幂等插入
/// - 抓取任务仓库（crawl_task_repository）：任务记录的持久化
pub mod crawl_task_repository;
pub mod creator_repository;
pub mod post_repository;
