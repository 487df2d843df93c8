//! Device tokens registered for push delivery.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use shared::entity::push_tokens;
use tracing::info;

use crate::error::{AppError, AppResult};

const PLATFORMS: &[&str] = &["web", "android", "ios"];

/// Register a device. Re-registering a known token moves it to the
/// caller and refreshes it.
pub async fn register(
    db: &DatabaseConnection,
    user_id: i32,
    token: &str,
    platform: Option<&str>,
) -> AppResult<push_tokens::Model> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Validation("Token is required".to_string()));
    }
    let platform = platform.map(|p| p.trim().to_lowercase()).filter(|p| !p.is_empty());
    if let Some(p) = &platform {
        if !PLATFORMS.contains(&p.as_str()) {
            return Err(AppError::Validation(format!("Unknown platform {}", p)));
        }
    }

    let now = Utc::now();
    let existing = push_tokens::Entity::find()
        .filter(push_tokens::Column::Token.eq(token))
        .one(db)
        .await?;

    let saved = match existing {
        Some(row) => {
            let mut active: push_tokens::ActiveModel = row.into();
            active.user_id = ActiveValue::Set(user_id);
            if platform.is_some() {
                active.platform = ActiveValue::Set(platform);
            }
            active.last_seen_at = ActiveValue::Set(now);
            active.update(db).await?
        }
        None => {
            let row = push_tokens::ActiveModel {
                user_id: ActiveValue::Set(user_id),
                token: ActiveValue::Set(token.to_string()),
                platform: ActiveValue::Set(platform),
                created_at: ActiveValue::Set(now),
                last_seen_at: ActiveValue::Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
            info!("📱 Push token registered for user {}", user_id);
            row
        }
    };
    Ok(saved)
}

/// Returns whether a row was removed.
pub async fn deregister(db: &DatabaseConnection, user_id: i32, token: &str) -> AppResult<bool> {
    let result = push_tokens::Entity::delete_many()
        .filter(push_tokens::Column::Token.eq(token.trim()))
        .filter(push_tokens::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn all_tokens(db: &DatabaseConnection) -> AppResult<Vec<String>> {
    let tokens = push_tokens::Entity::find()
        .select_only()
        .column(push_tokens::Column::Token)
        .order_by_asc(push_tokens::Column::Id)
        .into_tuple::<String>()
        .all(db)
        .await?;
    Ok(tokens)
}
