use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// Partial index, same syntax on Postgres and SQLite.
const CREATE: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_signals_one_active \
    ON signals (channel_id, symbol, timeframe) WHERE status = 'ACTIVE'";
const DROP: &str = "DROP INDEX IF EXISTS idx_signals_one_active";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(CREATE).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(DROP).await?;
        Ok(())
    }
}
