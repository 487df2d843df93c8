use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::channels::Channel;
use shared::entity::signals;
use shared::realtime::channel_topic;
use shared::{EventKind, Money, ReactionTarget, Side, SignalStatus};

use super::channels::{ReactionRequest, ReactionResponse};
use super::{accessible_channel, ok, publish, ApiResponse};
use crate::auth::{AdminUser, AuthUser};
use crate::error::{AppError, AppResult};
use crate::services::messages::MessageView;
use crate::services::push::{self, closure_notification, new_signal_notification, SignalPayload};
use crate::services::reactions;
use crate::services::signals::{self as signal_service, CloseInput, SignalEdit, SignalInput, SignalView};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SignalListQuery {
    pub status: Option<String>,
    pub before: Option<i32>,
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
pub struct CreateSignalRequest {
    #[serde(rename = "type")]
    pub side: Option<String>,
    pub symbol: String,
    pub timeframe: Option<String>,
    pub entry: String,
    #[serde(alias = "takeProfit")]
    pub take_profit: String,
    #[serde(alias = "stopLoss")]
    pub stop_loss: String,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
    pub attachment_data: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_name: Option<String>,
}

#[derive(Deserialize)]
pub struct CloseSignalRequest {
    pub status: String,
    pub pnl: Option<String>,
    pub close_message: Option<String>,
    pub closure_image: Option<String>,
    pub loss_reason: Option<String>,
}

#[derive(Deserialize)]
pub struct EditSignalRequest {
    pub entry: Option<String>,
    #[serde(alias = "takeProfit")]
    pub take_profit: Option<String>,
    #[serde(alias = "stopLoss")]
    pub stop_loss: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct SignalPageResponse {
    pub signals: Vec<SignalView>,
    pub next_before: Option<i32>,
}

#[derive(Serialize)]
pub struct PublishedSignal {
    pub signal: SignalView,
    pub message: MessageView,
}

pub fn signal_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/channels/:channel_id/signals",
            get(list_signals).post(create_signal),
        )
        .route(
            "/api/signals/:id",
            get(get_signal).put(edit_signal).delete(delete_signal),
        )
        .route("/api/signals/:id/close", post(close_signal))
        .route("/api/signals/:id/reactions", post(react))
}

fn signal_channel(auth: &AuthUser, channel_id: &str) -> AppResult<&'static Channel> {
    let channel = accessible_channel(auth, channel_id)?;
    if !channel.has_signals() {
        return Err(AppError::Validation(format!("{} has no signals", channel.name)));
    }
    Ok(channel)
}

async fn view_with_reactions(state: &AppState, signal: &signals::Model, caller: i32) -> AppResult<SignalView> {
    let counts = reactions::counts_for(&state.db, ReactionTarget::Signal, signal.id, caller).await?;
    Ok(SignalView::new(signal, counts))
}

async fn list_signals(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<String>,
    Query(query): Query<SignalListQuery>,
) -> Result<Json<ApiResponse<SignalPageResponse>>, AppError> {
    signal_channel(&auth, &channel_id)?;
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<SignalStatus>)
        .transpose()?;
    let limit = query.limit.unwrap_or(state.config.signal_page_limit);

    let page = signal_service::list_signals(&state.db, &channel_id, status, query.before, limit).await?;
    let ids: Vec<i32> = page.signals.iter().map(|s| s.id).collect();
    let mut counts = reactions::counts(&state.db, ReactionTarget::Signal, &ids, auth.id()).await?;
    let signals = page
        .signals
        .iter()
        .map(|s| SignalView::new(s, counts.remove(&s.id).unwrap_or_default()))
        .collect();

    Ok(ok(SignalPageResponse {
        signals,
        next_before: page.next_before,
    }))
}

async fn create_signal(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(channel_id): Path<String>,
    Json(req): Json<CreateSignalRequest>,
) -> Result<Json<ApiResponse<PublishedSignal>>, AppError> {
    signal_channel(&admin, &channel_id)?;
    let side = req
        .side
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<Side>)
        .transpose()?;

    let (signal, message) = signal_service::create_signal(
        &state.db,
        &channel_id,
        &admin.user,
        SignalInput {
            side,
            symbol: req.symbol,
            timeframe: req.timeframe,
            entry: req.entry,
            take_profit: req.take_profit,
            stop_loss: req.stop_loss,
            description: req.description,
            image: req.image,
            attachment_data: req.attachment_data,
            attachment_type: req.attachment_type,
            attachment_name: req.attachment_name,
        },
    )
    .await?;

    let published = PublishedSignal {
        signal: SignalView::new(&signal, Vec::new()),
        message: MessageView::new(&message, Vec::new()),
    };
    let topic = channel_topic(&channel_id);
    publish(&state, &topic, EventKind::SignalCreated, &published.signal).await;
    publish(&state, &topic, EventKind::MessageCreated, &published.message).await;

    push::spawn_broadcast(
        state.db.clone(),
        state.push.clone(),
        new_signal_notification(&SignalPayload::from(&signal)),
    );
    Ok(ok(published))
}

async fn get_signal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SignalView>>, AppError> {
    let signal = signal_service::get_signal(&state.db, id).await?;
    signal_channel(&auth, &signal.channel_id)?;
    Ok(ok(view_with_reactions(&state, &signal, auth.id()).await?))
}

/// Free-text P&L; blank means not given.
fn parse_pnl_input(raw: Option<&str>) -> Option<Money> {
    raw.map(str::trim)
        .filter(|p| !p.is_empty())
        .map(Money::parse_lenient)
}

async fn close_signal(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    Json(req): Json<CloseSignalRequest>,
) -> Result<Json<ApiResponse<PublishedSignal>>, AppError> {
    let status: SignalStatus = req.status.parse()?;
    let (signal, message) = signal_service::close_signal(
        &state.db,
        id,
        &admin.user,
        CloseInput {
            status,
            pnl: parse_pnl_input(req.pnl.as_deref()),
            close_message: req.close_message,
            closure_image: req.closure_image,
            loss_reason: req.loss_reason,
        },
    )
    .await?;

    let published = PublishedSignal {
        signal: view_with_reactions(&state, &signal, admin.id()).await?,
        message: MessageView::new(&message, Vec::new()),
    };
    let topic = channel_topic(&signal.channel_id);
    publish(&state, &topic, EventKind::SignalUpdated, &published.signal).await;
    publish(&state, &topic, EventKind::MessageCreated, &published.message).await;

    push::spawn_broadcast(
        state.db.clone(),
        state.push.clone(),
        closure_notification(&SignalPayload::from(&signal)),
    );
    Ok(ok(published))
}

async fn edit_signal(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    Json(req): Json<EditSignalRequest>,
) -> Result<Json<ApiResponse<SignalView>>, AppError> {
    let signal = signal_service::edit_signal(
        &state.db,
        id,
        SignalEdit {
            entry: req.entry,
            take_profit: req.take_profit,
            stop_loss: req.stop_loss,
            description: req.description,
        },
    )
    .await?;

    let view = view_with_reactions(&state, &signal, admin.id()).await?;
    publish(&state, &channel_topic(&signal.channel_id), EventKind::SignalUpdated, &view).await;
    Ok(ok(view))
}

async fn delete_signal(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let signal = signal_service::delete_signal(&state.db, id).await?;
    reactions::clear(&state.db, ReactionTarget::Signal, id).await?;

    let payload = json!({ "id": signal.id, "channel_id": signal.channel_id });
    publish(&state, &channel_topic(&signal.channel_id), EventKind::SignalDeleted, &payload).await;
    Ok(ok(()))
}

async fn react(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<ReactionRequest>,
) -> Result<Json<ApiResponse<ReactionResponse>>, AppError> {
    let signal = signal_service::get_signal(&state.db, id).await?;
    signal_channel(&auth, &signal.channel_id)?;

    let reacted = reactions::toggle(&state.db, ReactionTarget::Signal, id, &req.emoji, auth.id()).await?;
    let counts = reactions::counts_for(&state.db, ReactionTarget::Signal, id, auth.id()).await?;

    let payload = reactions::changed_payload(ReactionTarget::Signal, id, &counts);
    publish(&state, &channel_topic(&signal.channel_id), EventKind::ReactionChanged, &payload).await;
    Ok(ok(ReactionResponse {
        reacted,
        reactions: counts,
    }))
}
