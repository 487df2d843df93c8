use sea_orm::DatabaseConnection;
use shared::{Config, EventHub};
use std::sync::Arc;
use std::time::Instant;

use crate::services::push::PushProvider;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<Config>,
    pub hub: EventHub,
    pub push: Arc<dyn PushProvider>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, push: Arc<dyn PushProvider>) -> Self {
        let hub = EventHub::with_max_topics(config.realtime_backlog, config.realtime_max_topics);
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            hub,
            push,
            started_at: Instant::now(),
        }
    }
}
