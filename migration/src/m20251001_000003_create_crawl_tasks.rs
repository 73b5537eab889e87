// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 创建抓取任务记录表
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrawlTasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrawlTasks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CrawlTasks::CreatorId).uuid())
                    .col(ColumnDef::new(CrawlTasks::Platform).string_len(32).not_null())
                    .col(ColumnDef::new(CrawlTasks::TargetUrl).text().not_null())
                    .col(ColumnDef::new(CrawlTasks::Status).string_len(20).not_null())
                    .col(
                        ColumnDef::new(CrawlTasks::AttemptCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CrawlTasks::MaxAttempts)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(CrawlTasks::ErrorMessage).text())
                    .col(ColumnDef::new(CrawlTasks::Result).json())
                    .col(
                        ColumnDef::new(CrawlTasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(CrawlTasks::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(CrawlTasks::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(CrawlTasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crawl_tasks_status")
                    .table(CrawlTasks::Table)
                    .col(CrawlTasks::Status)
                    .col(CrawlTasks::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crawl_tasks_creator")
                    .table(CrawlTasks::Table)
                    .col(CrawlTasks::CreatorId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawlTasks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CrawlTasks {
    Table,
    Id,
    CreatorId,
    Platform,
    TargetUrl,
    Status,
    AttemptCount,
    MaxAttempts,
    ErrorMessage,
    Result,
    CreatedAt,
    StartedAt,
    CompletedAt,
    UpdatedAt,
}
