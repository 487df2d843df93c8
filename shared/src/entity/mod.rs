//! `SeaORM` Entities, @generated manually

pub mod messages;
pub mod personal_trades;
pub mod push_tokens;
pub mod reactions;
pub mod sessions;
pub mod signals;
pub mod user_accounts;
pub mod users;
