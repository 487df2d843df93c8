use sea_orm_migration::prelude::*;

use crate::m20250601_000001_create_users_and_sessions::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Chat messages (one row per message, channel is a catalog id)
        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Messages::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Messages::ChannelId).string().not_null())
                    .col(ColumnDef::new(Messages::UserId).integer().null())
                    .col(ColumnDef::new(Messages::Content).text().not_null())
                    .col(ColumnDef::new(Messages::Author).string().not_null())
                    .col(ColumnDef::new(Messages::AuthorType).string().not_null()) // "admin" or "user"
                    .col(ColumnDef::new(Messages::AuthorAvatar).text().null())
                    .col(ColumnDef::new(Messages::AttachmentData).text().null())
                    .col(ColumnDef::new(Messages::AttachmentType).string().null())
                    .col(ColumnDef::new(Messages::AttachmentName).string().null())
                    .col(ColumnDef::new(Messages::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Messages::UpdatedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_messages_user")
                            .from(Messages::Table, Messages::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_channel_created")
                    .table(Messages::Table)
                    .col(Messages::ChannelId)
                    .col(Messages::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Signals (ACTIVE -> WIN / LOSS / BE, closed in place)
        manager
            .create_table(
                Table::create()
                    .table(Signals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Signals::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Signals::ChannelId).string().not_null())
                    .col(ColumnDef::new(Signals::AuthorId).integer().null())
                    .col(ColumnDef::new(Signals::SignalType).string().not_null()) // "BUY" or "SELL"
                    .col(ColumnDef::new(Signals::Symbol).string().not_null())
                    .col(ColumnDef::new(Signals::Timeframe).string().not_null())
                    .col(ColumnDef::new(Signals::Entry).string().not_null())
                    .col(ColumnDef::new(Signals::TakeProfit).string().not_null())
                    .col(ColumnDef::new(Signals::StopLoss).string().not_null())
                    .col(ColumnDef::new(Signals::Description).text().not_null())
                    .col(ColumnDef::new(Signals::Image).text().null())
                    .col(ColumnDef::new(Signals::AttachmentData).text().null())
                    .col(ColumnDef::new(Signals::AttachmentType).string().null())
                    .col(ColumnDef::new(Signals::AttachmentName).string().null())
                    .col(ColumnDef::new(Signals::Status).string().not_null().default("ACTIVE"))
                    .col(ColumnDef::new(Signals::Pnl).string().null())
                    .col(ColumnDef::new(Signals::CloseMessage).text().null())
                    .col(ColumnDef::new(Signals::ClosureImage).text().null())
                    .col(ColumnDef::new(Signals::LossReason).string().null())
                    .col(ColumnDef::new(Signals::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Signals::ClosedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_signals_author")
                            .from(Signals::Table, Signals::AuthorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_signals_channel_status")
                    .table(Signals::Table)
                    .col(Signals::ChannelId)
                    .col(Signals::Status)
                    .to_owned(),
            )
            .await?;

        // Reactions on messages and signals, one row per (target, emoji, user)
        manager
            .create_table(
                Table::create()
                    .table(Reactions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Reactions::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Reactions::TargetKind).string().not_null()) // "message" or "signal"
                    .col(ColumnDef::new(Reactions::TargetId).integer().not_null())
                    .col(ColumnDef::new(Reactions::Emoji).string().not_null())
                    .col(ColumnDef::new(Reactions::UserId).integer().not_null())
                    .col(ColumnDef::new(Reactions::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reactions_user")
                            .from(Reactions::Table, Reactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reactions_unique")
                    .table(Reactions::Table)
                    .col(Reactions::TargetKind)
                    .col(Reactions::TargetId)
                    .col(Reactions::Emoji)
                    .col(Reactions::UserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Signals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Messages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
    ChannelId,
    UserId,
    Content,
    Author,
    AuthorType,
    AuthorAvatar,
    AttachmentData,
    AttachmentType,
    AttachmentName,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Signals {
    Table,
    Id,
    ChannelId,
    AuthorId,
    SignalType,
    Symbol,
    Timeframe,
    Entry,
    TakeProfit,
    StopLoss,
    Description,
    Image,
    AttachmentData,
    AttachmentType,
    AttachmentName,
    Status,
    Pnl,
    CloseMessage,
    ClosureImage,
    LossReason,
    CreatedAt,
    ClosedAt,
}

#[derive(DeriveIden)]
enum Reactions {
    Table,
    Id,
    TargetKind,
    TargetId,
    Emoji,
    UserId,
    CreatedAt,
}
