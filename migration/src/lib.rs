pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_users_and_sessions;
mod m20250601_000002_create_messages_and_signals;
mod m20250602_000001_create_accounts_and_trades;
mod m20250603_000001_create_push_tokens;
mod m20250604_000001_unique_active_signal;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_users_and_sessions::Migration),
            Box::new(m20250601_000002_create_messages_and_signals::Migration),
            Box::new(m20250602_000001_create_accounts_and_trades::Migration),
            Box::new(m20250603_000001_create_push_tokens::Migration),
            Box::new(m20250604_000001_unique_active_signal::Migration),
        ]
    }
}
