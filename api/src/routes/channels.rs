use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::channels::{accessible_channels, Channel};
use shared::realtime::channel_topic;
use shared::{EventKind, ReactionCount, ReactionTarget};

use super::{accessible_channel, ok, publish, ApiResponse};
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::services::messages::{self as message_service, MessageInput, MessageView};
use crate::services::reactions;
use crate::state::AppState;

const MAX_TAIL: u64 = 200;

#[derive(Deserialize)]
pub struct TailQuery {
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub content: String,
    pub attachment_data: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_name: Option<String>,
}

#[derive(Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Deserialize)]
pub struct ReactionRequest {
    pub emoji: String,
}

#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub reacted: bool,
    pub reactions: Vec<ReactionCount>,
}

pub fn channel_routes() -> Router<AppState> {
    Router::new()
        .route("/api/channels", get(list_channels))
        .route(
            "/api/channels/:channel_id/messages",
            get(list_messages).post(create_message),
        )
        .route("/api/messages/:id", put(update_message).delete(delete_message))
        .route("/api/messages/:id/reactions", post(react))
}

fn message_channel(auth: &AuthUser, channel_id: &str) -> AppResult<&'static Channel> {
    let channel = accessible_channel(auth, channel_id)?;
    if !channel.has_messages() {
        return Err(AppError::Validation(format!("{} has no message stream", channel.name)));
    }
    Ok(channel)
}

async fn list_channels(auth: AuthUser) -> Json<ApiResponse<Vec<&'static Channel>>> {
    ok(accessible_channels(auth.plan(), auth.is_admin()))
}

async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<String>,
    Query(query): Query<TailQuery>,
) -> Result<Json<ApiResponse<Vec<MessageView>>>, AppError> {
    message_channel(&auth, &channel_id)?;
    let limit = query
        .limit
        .unwrap_or(state.config.message_tail_limit)
        .clamp(1, MAX_TAIL);

    let tail = message_service::list_tail(&state.db, &channel_id, limit).await?;
    let ids: Vec<i32> = tail.iter().map(|m| m.id).collect();
    let mut counts = reactions::counts(&state.db, ReactionTarget::Message, &ids, auth.id()).await?;
    let views = tail
        .iter()
        .map(|m| MessageView::new(m, counts.remove(&m.id).unwrap_or_default()))
        .collect();
    Ok(ok(views))
}

async fn create_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<ApiResponse<MessageView>>, AppError> {
    message_channel(&auth, &channel_id)?;
    let message = message_service::create_message(
        state.db.as_ref(),
        &channel_id,
        &auth.user,
        MessageInput {
            content: req.content,
            attachment_data: req.attachment_data,
            attachment_type: req.attachment_type,
            attachment_name: req.attachment_name,
        },
    )
    .await?;

    let view = MessageView::new(&message, Vec::new());
    publish(&state, &channel_topic(&channel_id), EventKind::MessageCreated, &view).await;
    Ok(ok(view))
}

async fn update_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<EditMessageRequest>,
) -> Result<Json<ApiResponse<MessageView>>, AppError> {
    let existing = message_service::get_message(&state.db, id).await?;
    message_channel(&auth, &existing.channel_id)?;
    let message = message_service::update_message(&state.db, id, &auth.user, &req.content).await?;

    let counts = reactions::counts_for(&state.db, ReactionTarget::Message, id, auth.id()).await?;
    let view = MessageView::new(&message, counts);
    publish(&state, &channel_topic(&message.channel_id), EventKind::MessageUpdated, &view).await;
    Ok(ok(view))
}

async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let existing = message_service::get_message(&state.db, id).await?;
    message_channel(&auth, &existing.channel_id)?;
    let message = message_service::delete_message(&state.db, id, &auth.user).await?;
    reactions::clear(&state.db, ReactionTarget::Message, id).await?;

    let payload = json!({ "id": message.id, "channel_id": message.channel_id });
    publish(&state, &channel_topic(&message.channel_id), EventKind::MessageDeleted, &payload).await;
    Ok(ok(()))
}

async fn react(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<ReactionRequest>,
) -> Result<Json<ApiResponse<ReactionResponse>>, AppError> {
    let message = message_service::get_message(&state.db, id).await?;
    message_channel(&auth, &message.channel_id)?;

    let reacted = reactions::toggle(&state.db, ReactionTarget::Message, id, &req.emoji, auth.id()).await?;
    let counts = reactions::counts_for(&state.db, ReactionTarget::Message, id, auth.id()).await?;

    let payload = reactions::changed_payload(ReactionTarget::Message, id, &counts);
    publish(&state, &channel_topic(&message.channel_id), EventKind::ReactionChanged, &payload).await;
    Ok(ok(ReactionResponse {
        reacted,
        reactions: counts,
    }))
}
