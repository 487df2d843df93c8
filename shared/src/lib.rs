pub mod channels;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod loss_reasons;
pub mod models;
pub mod money;
pub mod realtime;
pub mod stats;
pub mod templates;

pub use config::Config;
pub use database::get_db_connection;
pub use error::DomainError;
pub use models::*;
pub use money::Money;
pub use realtime::{EventHub, EventKind};
