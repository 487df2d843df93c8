use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::{ok, ApiResponse};
use crate::auth::{AdminUser, AuthUser};
use crate::error::AppError;
use crate::services::push::{
    closure_notification, fan_out, livestream_notification, new_signal_notification, FanOutReport,
    Notification, SignalPayload,
};
use crate::services::push_tokens;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SignalNotificationRequest {
    pub signal: Option<SignalPayload>,
    pub tokens: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivestreamNotificationRequest {
    pub tokens: Option<Vec<String>>,
    pub custom_message: Option<String>,
}

#[derive(Deserialize)]
pub struct PushTokenRequest {
    pub token: String,
    pub platform: Option<String>,
}

#[derive(Deserialize)]
pub struct RemoveTokenRequest {
    pub token: String,
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications/signal", post(notify_signal))
        .route("/api/notifications/closure", post(notify_closure))
        .route("/api/notifications/livestream", post(notify_livestream))
        .route("/api/push-tokens", post(register_token).delete(remove_token))
}

fn signal_and_tokens(req: SignalNotificationRequest) -> Result<(SignalPayload, Vec<String>), AppError> {
    match (req.signal, req.tokens) {
        (Some(signal), Some(tokens)) => Ok((signal, tokens)),
        _ => Err(AppError::Validation(
            "Données manquantes: signal et tokens requis".to_string(),
        )),
    }
}

async fn deliver(state: &AppState, tokens: &[String], notification: &Notification) -> Json<FanOutReport> {
    Json(fan_out(state.push.as_ref(), tokens, notification).await)
}

async fn notify_signal(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(req): Json<SignalNotificationRequest>,
) -> Result<Json<FanOutReport>, AppError> {
    let (signal, tokens) = signal_and_tokens(req)?;
    Ok(deliver(&state, &tokens, &new_signal_notification(&signal)).await)
}

async fn notify_closure(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(req): Json<SignalNotificationRequest>,
) -> Result<Json<FanOutReport>, AppError> {
    let (signal, tokens) = signal_and_tokens(req)?;
    Ok(deliver(&state, &tokens, &closure_notification(&signal)).await)
}

async fn notify_livestream(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(req): Json<LivestreamNotificationRequest>,
) -> Result<Json<FanOutReport>, AppError> {
    let tokens = req
        .tokens
        .ok_or_else(|| AppError::Validation("Tokens requis".to_string()))?;
    let notification = livestream_notification(req.custom_message.as_deref());
    Ok(deliver(&state, &tokens, &notification).await)
}

async fn register_token(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PushTokenRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    push_tokens::register(&state.db, auth.id(), &req.token, req.platform.as_deref()).await?;
    Ok(ok(()))
}

async fn remove_token(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<RemoveTokenRequest>,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    let removed = push_tokens::deregister(&state.db, auth.id(), &req.token).await?;
    Ok(ok(removed))
}
