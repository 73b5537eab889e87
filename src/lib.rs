// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 内容获取模块
///
/// 会话、直接抓取、搜索发现与合成占位组成的获取链
pub mod acquisition;

/// 应用程序模块
///
/// 管理接口的数据传输对象
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// 浏览器与 HTTP 抓取后端，以及带熔断的后端路由
pub mod engines;

/// 基础设施模块
///
/// 数据库、仓库实现、搜索引擎与指标导出
pub mod infrastructure;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由与处理器
pub mod presentation;

/// 队列模块
///
/// 进程内的抓取调度器
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 执行抓取作业与临时任务
pub mod workers;
