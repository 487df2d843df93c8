use axum::Json;
use serde::Serialize;
use shared::channels::{find_channel, has_channel_access, Channel};
use shared::EventKind;
use tracing::warn;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub mod accounts;
pub mod auth;
pub mod channels;
pub mod chat;
pub mod events;
pub mod journal;
pub mod notifications;
pub mod signals;
pub mod stats;
pub mod users;

const JOURNAL_CHANNEL: &str = "journal";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

/// Resolve a channel the caller's plan unlocks.
pub(crate) fn accessible_channel(user: &AuthUser, channel_id: &str) -> AppResult<&'static Channel> {
    let channel = find_channel(channel_id)?;
    if !has_channel_access(user.plan(), user.is_admin(), channel_id) {
        return Err(AppError::Forbidden(format!(
            "Your plan does not include {}",
            channel.name
        )));
    }
    Ok(channel)
}

/// Personal journal, accounts and their statistics.
pub(crate) fn journal_access(user: &AuthUser) -> AppResult<()> {
    accessible_channel(user, JOURNAL_CHANNEL).map(|_| ())
}

/// Push a view onto a realtime topic.
pub(crate) async fn publish<T: Serialize>(state: &AppState, topic: &str, kind: EventKind, view: &T) {
    match serde_json::to_value(view) {
        Ok(payload) => {
            state.hub.publish(topic, kind, payload).await;
        }
        Err(e) => warn!("⚠️ Could not serialize {} event: {}", kind.as_str(), e),
    }
}
