// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::models::crawl_task::DomainError;
use crate::domain::models::platform::UnknownPlatform;
use crate::domain::repositories::crawl_task_repository::RepositoryError;
use crate::queue::scheduler::SchedulerError;

/// 处理器自身产生的请求错误
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

/// 应用错误类型
///
/// 封装所有可能的应用层错误，按底层错误类型映射状态码
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<RequestError>() {
            return match err {
                RequestError::BadRequest(_) => StatusCode::BAD_REQUEST,
                RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            };
        }
        if self.0.downcast_ref::<validator::ValidationErrors>().is_some()
            || self.0.downcast_ref::<UnknownPlatform>().is_some()
        {
            return StatusCode::BAD_REQUEST;
        }
        if let Some(err) = self.0.downcast_ref::<DomainError>() {
            return match err {
                DomainError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
                DomainError::ValidationError(_) => StatusCode::BAD_REQUEST,
            };
        }
        if let Some(err) = self.0.downcast_ref::<SchedulerError>() {
            return match err {
                SchedulerError::AlreadyRunning
                | SchedulerError::Stopping
                | SchedulerError::CreatorBusy(_) => StatusCode::CONFLICT,
                SchedulerError::CreatorNotFound(_) => StatusCode::NOT_FOUND,
                SchedulerError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
                SchedulerError::Repository(_) | SchedulerError::Join(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
        }
        match self.0.downcast_ref::<RepositoryError>() {
            Some(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
