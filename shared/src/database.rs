use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use anyhow::Result;
use std::time::Duration;
use tracing::info;

pub async fn get_db_connection(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database via Sea-ORM at: {}", redact(database_url));
    let mut options = ConnectOptions::new(database_url.to_string());
    options
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    // Every pooled connection to `sqlite::memory:` is a separate database.
    if database_url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }
    let db = Database::connect(options).await?;
    Ok(db)
}

/// Hide the password part of a connection URL before logging it.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            let credentials = &url[scheme + 3..at];
            match credentials.find(':') {
                Some(colon) => format!(
                    "{}{}:***{}",
                    &url[..scheme + 3],
                    &credentials[..colon],
                    &url[at..]
                ),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}
