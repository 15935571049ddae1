//! Create push token table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PushToken::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PushToken::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PushToken::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(PushToken::Token).text().not_null())
                    .col(ColumnDef::new(PushToken::Platform).string_len(16).not_null())
                    .col(ColumnDef::new(PushToken::DeviceName).string_len(256))
                    .col(ColumnDef::new(PushToken::DeviceId).string_len(256))
                    .col(
                        ColumnDef::new(PushToken::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(PushToken::LastUsedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PushToken::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(PushToken::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_push_token_user")
                            .from(PushToken::Table, PushToken::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: user_id (for listing a user's devices)
        manager
            .create_index(
                Index::create()
                    .name("idx_push_token_user_id")
                    .table(PushToken::Table)
                    .col(PushToken::UserId)
                    .to_owned(),
            )
            .await?;

        // Unique: one row per (user, token)
        manager
            .create_index(
                Index::create()
                    .name("idx_push_token_user_token")
                    .table(PushToken::Table)
                    .col(PushToken::UserId)
                    .col(PushToken::Token)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: active (for filtering active tokens)
        manager
            .create_index(
                Index::create()
                    .name("idx_push_token_active")
                    .table(PushToken::Table)
                    .col(PushToken::Active)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PushToken::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PushToken {
    Table,
    Id,
    UserId,
    Token,
    Platform,
    DeviceName,
    DeviceId,
    Active,
    LastUsedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
