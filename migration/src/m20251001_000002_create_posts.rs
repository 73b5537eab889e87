// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 创建内容表
///
/// content_hash 全局唯一，(creator_id, origin_id) 组合唯一
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Posts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Posts::CreatorId).uuid())
                    .col(ColumnDef::new(Posts::Platform).string_len(32).not_null())
                    .col(ColumnDef::new(Posts::OriginId).string())
                    .col(ColumnDef::new(Posts::ContentHash).string_len(64).not_null())
                    .col(ColumnDef::new(Posts::Title).text().not_null())
                    .col(ColumnDef::new(Posts::Body).text().not_null())
                    .col(ColumnDef::new(Posts::Author).string())
                    .col(ColumnDef::new(Posts::Url).text())
                    .col(ColumnDef::new(Posts::Tags).json().not_null())
                    .col(ColumnDef::new(Posts::MediaUrls).json().not_null())
                    .col(ColumnDef::new(Posts::PublishedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Posts::Confidence)
                            .string_len(16)
                            .not_null()
                            .default("direct"),
                    )
                    .col(ColumnDef::new(Posts::Source).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Posts::CreatedAt)
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
                    .name("uq_posts_content_hash")
                    .table(Posts::Table)
                    .col(Posts::ContentHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // NULL origin_id values never collide
        manager
            .create_index(
                Index::create()
                    .name("uq_posts_creator_origin")
                    .table(Posts::Table)
                    .col(Posts::CreatorId)
                    .col(Posts::OriginId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_created_at")
                    .table(Posts::Table)
                    .col(Posts::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
    CreatorId,
    Platform,
    OriginId,
    ContentHash,
    Title,
    Body,
    Author,
    Url,
    Tags,
    MediaUrls,
    PublishedAt,
    Confidence,
    Source,
    CreatedAt,
}
