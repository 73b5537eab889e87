// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 创建创作者表
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Creators::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Creators::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Creators::Platform).string_len(32).not_null())
                    .col(ColumnDef::new(Creators::ProfileUrl).string().not_null())
                    .col(ColumnDef::new(Creators::DisplayName).string().not_null())
                    .col(
                        ColumnDef::new(Creators::AutoCrawlEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Creators::CrawlInterval)
                            .integer()
                            .not_null()
                            .default(60),
                    )
                    .col(
                        ColumnDef::new(Creators::CrawlStatus)
                            .string_len(20)
                            .not_null()
                            .default("idle"),
                    )
                    .col(ColumnDef::new(Creators::LastCrawlAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Creators::NextCrawlAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Creators::CrawlError).text())
                    .col(
                        ColumnDef::new(Creators::ConsecutiveFailures)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Creators::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Creators::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // discovery query: auto_crawl_enabled + crawl_status + next_crawl_at
        manager
            .create_index(
                Index::create()
                    .name("idx_creators_due")
                    .table(Creators::Table)
                    .col(Creators::AutoCrawlEnabled)
                    .col(Creators::CrawlStatus)
                    .col(Creators::NextCrawlAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Creators::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Creators {
    Table,
    Id,
    Platform,
    ProfileUrl,
    DisplayName,
    AutoCrawlEnabled,
    CrawlInterval,
    CrawlStatus,
    LastCrawlAt,
    NextCrawlAt,
    CrawlError,
    ConsecutiveFailures,
    CreatedAt,
    UpdatedAt,
}
