//! Create notification preference table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NotificationPreference::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationPreference::UserId)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::PushEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::QuietHoursEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::QuietHoursStart)
                            .string_len(5)
                            .not_null()
                            .default("22:00"),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::QuietHoursEnd)
                            .string_len(5)
                            .not_null()
                            .default("07:00"),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::UpdatedAt)
                            .timestamp_with_time_zone(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_preference_user")
                            .from(
                                NotificationPreference::Table,
                                NotificationPreference::UserId,
                            )
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(NotificationPreference::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum NotificationPreference {
    Table,
    UserId,
    PushEnabled,
    QuietHoursEnabled,
    QuietHoursStart,
    QuietHoursEnd,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
