use anyhow::Result;
use api::services::push::{DisabledProvider, FcmProvider, PushProvider};
use api::{build_router, AppState};
use migration::{Migrator, MigratorTrait};
use shared::{get_db_connection, Config};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn push_provider(config: &Config) -> Arc<dyn PushProvider> {
    match (config.fcm_send_url(), config.fcm_access_token.clone()) {
        (Some(url), Some(token)) => {
            info!("📣 Push delivery via FCM");
            Arc::new(FcmProvider::new(url, token, config.push_icon.clone()))
        }
        _ => {
            warn!("⚠️ FCM not configured, push notifications disabled");
            Arc::new(DisabledProvider)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_json);

    info!("🚀 Starting signals API server...");

    let db = get_db_connection(&config.database_url).await?;
    info!("✅ Connected to database");

    if config.run_migrations {
        Migrator::up(&db, None).await?;
        info!("✅ Migrations applied");
    }

    let push = push_provider(&config);
    let bind_addr = config.bind_addr.clone();
    let app = build_router(AppState::new(db, config, push));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("📡 API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
