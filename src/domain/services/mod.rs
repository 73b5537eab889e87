// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// - 内容服务（content_service）：原始条目的规范化、指纹计算与去重写入
pub mod content_service;
