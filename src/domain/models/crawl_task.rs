// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::platform::Platform;
use super::raw_item::Confidence;

/// 抓取任务实体
///
/// 记录一次抓取尝试的完整生命周期。调度作业为每个创作者生成一条记录，
/// 管理接口也可以创建不关联创作者的临时任务。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlTask {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 关联的创作者，临时任务为空
    pub creator_id: Option<Uuid>,
    /// 目标平台
    pub platform: Platform,
    /// 目标地址
    pub target_url: String,
    /// 任务状态
    pub status: TaskStatus,
    /// 已尝试次数
    pub attempt_count: i32,
    /// 最大尝试次数
    pub max_attempts: i32,
    /// 错误信息
    pub error_message: Option<String>,
    /// 抓取结果摘要
    pub result: Option<TaskResult>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 开始时间
    pub started_at: Option<DateTime<Utc>>,
    /// 结束时间
    pub completed_at: Option<DateTime<Utc>>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 任务状态枚举
///
/// 状态转换遵循以下流程：
/// Pending → Processing → Success/Failed
/// Failed → Retry → Processing（仍有剩余尝试次数时）
/// Success → Completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 待处理
    #[default]
    Pending,
    /// 处理中
    Processing,
    /// 抓取成功，结果尚未确认
    Success,
    /// 抓取失败
    Failed,
    /// 等待重试
    Retry,
    /// 已完成，不可再变更
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Retry => write!(f, "retry"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "processing" => Ok(TaskStatus::Processing),
            "success" => Ok(TaskStatus::Success),
            "failed" => Ok(TaskStatus::Failed),
            "retry" => Ok(TaskStatus::Retry),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(()),
        }
    }
}

/// 任务结果摘要
///
/// 保存首条内容的主要字段以及本次抓取的置信度和条目数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub publish_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub item_count: usize,
    /// 实际入库条数
    #[serde(default)]
    pub saved: usize,
    /// 因重复跳过的条数
    #[serde(default)]
    pub duplicates: usize,
}

/// 领域错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: TaskStatus, to: TaskStatus },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl CrawlTask {
    /// 创建一个新的待处理任务
    pub fn new(
        creator_id: Option<Uuid>,
        platform: Platform,
        target_url: impl Into<String>,
        max_attempts: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            creator_id,
            platform,
            target_url: target_url.into(),
            status: TaskStatus::Pending,
            attempt_count: 0,
            max_attempts: max_attempts.max(1),
            error_message: None,
            result: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    fn invalid(&self, to: TaskStatus) -> DomainError {
        DomainError::InvalidStateTransition {
            from: self.status,
            to,
        }
    }

    /// 开始处理
    ///
    /// Pending/Retry → Processing，同时累加尝试次数
    pub fn start(mut self) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Pending | TaskStatus::Retry => {
                let now = Utc::now();
                self.status = TaskStatus::Processing;
                self.attempt_count += 1;
                self.started_at = Some(now);
                self.completed_at = None;
                self.updated_at = now;
                Ok(self)
            }
            _ => Err(self.invalid(TaskStatus::Processing)),
        }
    }

    /// 标记抓取成功
    ///
    /// Processing → Success
    pub fn succeed(mut self, result: TaskResult) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Processing => {
                let now = Utc::now();
                self.status = TaskStatus::Success;
                self.result = Some(result);
                self.error_message = None;
                self.completed_at = Some(now);
                self.updated_at = now;
                Ok(self)
            }
            _ => Err(self.invalid(TaskStatus::Success)),
        }
    }

    /// 标记抓取失败
    ///
    /// Processing → Failed
    pub fn fail(mut self, error: impl Into<String>) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Processing => {
                let now = Utc::now();
                self.status = TaskStatus::Failed;
                self.error_message = Some(error.into());
                self.completed_at = Some(now);
                self.updated_at = now;
                Ok(self)
            }
            _ => Err(self.invalid(TaskStatus::Failed)),
        }
    }

    /// 进入重试
    ///
    /// Failed → Retry，仅在仍有剩余尝试次数时允许
    pub fn retry(mut self) -> Result<Self, DomainError> {
        if !self.can_retry() {
            return Err(self.invalid(TaskStatus::Retry));
        }
        self.status = TaskStatus::Retry;
        self.updated_at = Utc::now();
        Ok(self)
    }

    /// 确认完成
    ///
    /// Success → Completed
    pub fn complete(mut self) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Success => {
                self.status = TaskStatus::Completed;
                self.updated_at = Utc::now();
                Ok(self)
            }
            _ => Err(self.invalid(TaskStatus::Completed)),
        }
    }

    /// 按目标状态执行转换
    ///
    /// 管理接口使用，所有转换都经过对应的领域方法
    pub fn transition(
        self,
        target: TaskStatus,
        error: Option<String>,
    ) -> Result<Self, DomainError> {
        match target {
            TaskStatus::Processing => self.start(),
            TaskStatus::Success => {
                let result = self.result.clone().unwrap_or_default();
                self.succeed(result)
            }
            TaskStatus::Failed => {
                let message = error.unwrap_or_else(|| "marked failed".to_string());
                self.fail(message)
            }
            TaskStatus::Retry => self.retry(),
            TaskStatus::Completed => self.complete(),
            TaskStatus::Pending => Err(self.invalid(TaskStatus::Pending)),
        }
    }

    /// 判断任务是否可以重试
    pub fn can_retry(&self) -> bool {
        self.status == TaskStatus::Failed && self.attempt_count < self.max_attempts
    }

    /// 是否已到达终态
    pub fn is_terminal(&self) -> bool {
        match self.status {
            TaskStatus::Completed => true,
            TaskStatus::Failed => !self.can_retry(),
            _ => false,
        }
    }
}
