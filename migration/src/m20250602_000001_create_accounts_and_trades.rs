use sea_orm_migration::prelude::*;

use crate::m20250601_000001_create_users_and_sessions::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Trading accounts (one user can hold several, one of them default)
        manager
            .create_table(
                Table::create()
                    .table(UserAccounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserAccounts::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(UserAccounts::UserId).integer().not_null())
                    .col(ColumnDef::new(UserAccounts::AccountName).string().not_null())
                    .col(ColumnDef::new(UserAccounts::InitialBalance).string().not_null()) // decimal text
                    .col(ColumnDef::new(UserAccounts::MinimumBalance).string().not_null()) // decimal text
                    .col(ColumnDef::new(UserAccounts::IsDefault).boolean().not_null().default(false))
                    .col(ColumnDef::new(UserAccounts::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(UserAccounts::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_accounts_user")
                            .from(UserAccounts::Table, UserAccounts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_accounts_user_name")
                    .table(UserAccounts::Table)
                    .col(UserAccounts::UserId)
                    .col(UserAccounts::AccountName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Personal journal trades, attached to an account by id
        manager
            .create_table(
                Table::create()
                    .table(PersonalTrades::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PersonalTrades::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(PersonalTrades::UserId).integer().not_null())
                    .col(ColumnDef::new(PersonalTrades::AccountId).integer().not_null())
                    .col(ColumnDef::new(PersonalTrades::TradeDate).date().not_null())
                    .col(ColumnDef::new(PersonalTrades::EntryTime).string().null()) // "HH:MM"
                    .col(ColumnDef::new(PersonalTrades::Symbol).string().not_null())
                    .col(ColumnDef::new(PersonalTrades::Side).string().not_null()) // "BUY" or "SELL"
                    .col(ColumnDef::new(PersonalTrades::Entry).string().not_null())
                    .col(ColumnDef::new(PersonalTrades::Exit).string().not_null())
                    .col(ColumnDef::new(PersonalTrades::StopLoss).string().null())
                    .col(ColumnDef::new(PersonalTrades::Pnl).string().not_null()) // decimal text
                    .col(ColumnDef::new(PersonalTrades::Status).string().not_null()) // "WIN", "LOSS", "BE"
                    .col(ColumnDef::new(PersonalTrades::LossReasons).text().null()) // JSON array of reason ids
                    .col(ColumnDef::new(PersonalTrades::Notes).text().null())
                    .col(ColumnDef::new(PersonalTrades::Image1).text().null())
                    .col(ColumnDef::new(PersonalTrades::Image2).text().null())
                    .col(ColumnDef::new(PersonalTrades::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(PersonalTrades::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_personal_trades_user")
                            .from(PersonalTrades::Table, PersonalTrades::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_personal_trades_account")
                            .from(PersonalTrades::Table, PersonalTrades::AccountId)
                            .to(UserAccounts::Table, UserAccounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_personal_trades_account_date")
                    .table(PersonalTrades::Table)
                    .col(PersonalTrades::AccountId)
                    .col(PersonalTrades::TradeDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PersonalTrades::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserAccounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserAccounts {
    Table,
    Id,
    UserId,
    AccountName,
    InitialBalance,
    MinimumBalance,
    IsDefault,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PersonalTrades {
    Table,
    Id,
    UserId,
    AccountId,
    TradeDate,
    EntryTime,
    Symbol,
    Side,
    Entry,
    Exit,
    StopLoss,
    Pnl,
    Status,
    LossReasons,
    Notes,
    Image1,
    Image2,
    CreatedAt,
    UpdatedAt,
}
