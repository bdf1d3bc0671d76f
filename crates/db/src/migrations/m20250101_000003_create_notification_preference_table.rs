//! Create notification_preference table migration.

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
                        ColumnDef::new(NotificationPreference::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::UserId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::MealReminders)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::WaterReminders)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::ProgressUpdates)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::GroupActivity)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::WeeklyReports)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::BreakfastTime)
                            .string_len(5)
                            .not_null()
                            .default("08:00"),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::LunchTime)
                            .string_len(5)
                            .not_null()
                            .default("13:00"),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::DinnerTime)
                            .string_len(5)
                            .not_null()
                            .default("19:00"),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::PushEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(NotificationPreference::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(NotificationPreference::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_preference_user")
                            .from(NotificationPreference::Table, NotificationPreference::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationPreference::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum NotificationPreference {
    Table,
    Id,
    UserId,
    MealReminders,
    WaterReminders,
    ProgressUpdates,
    GroupActivity,
    WeeklyReports,
    BreakfastTime,
    LunchTime,
    DinnerTime,
    PushEnabled,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
