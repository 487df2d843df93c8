use sea_orm_migration::prelude::*;

use crate::m20250601_000001_create_users_and_sessions::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PushTokens::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PushTokens::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(PushTokens::UserId).integer().not_null())
                    .col(ColumnDef::new(PushTokens::Token).string().not_null().unique_key())
                    .col(ColumnDef::new(PushTokens::Platform).string().null()) // "web", "android", "ios"
                    .col(ColumnDef::new(PushTokens::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(PushTokens::LastSeenAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_push_tokens_user")
                            .from(PushTokens::Table, PushTokens::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PushTokens::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PushTokens {
    Table,
    Id,
    UserId,
    Token,
    Platform,
    CreatedAt,
    LastSeenAt,
}
