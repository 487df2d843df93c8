//! Server-sent event streams over the realtime hub.
//!
//! Clients reconnect with `?after=<seq>` (or the `Last-Event-ID` header the
//! browser sends on its own) to replay what they missed.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use shared::realtime::{channel_topic, journal_topic, Subscription};
use tracing::debug;

use super::{accessible_channel, journal_access};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct EventsQuery {
    pub after: Option<u64>,
}

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/api/channels/:channel_id/events", get(channel_events))
        .route("/api/journal/events", get(journal_events))
}

fn resume_point(query: &EventsQuery, headers: &HeaderMap) -> Option<u64> {
    query.after.or_else(|| {
        headers
            .get("last-event-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}

fn into_stream(subscription: Subscription) -> impl Stream<Item = Result<SseEvent, axum::Error>> {
    stream::unfold(subscription, |mut sub| async move {
        let event = sub.next().await?;
        let sse = SseEvent::default()
            .id(event.seq.to_string())
            .event(event.kind.as_str())
            .json_data(&event);
        Some((sse, sub))
    })
}

async fn channel_events(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<String>,
    Query(query): Query<EventsQuery>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, axum::Error>>>, AppError> {
    accessible_channel(&auth, &channel_id)?;
    let after = resume_point(&query, &headers);
    let topic = channel_topic(&channel_id);
    debug!("📡 {} subscribed to {} after {:?}", auth.user.email, topic, after);

    let subscription = state.hub.subscribe(&topic, after).await;
    Ok(Sse::new(into_stream(subscription)).keep_alive(KeepAlive::default()))
}

async fn journal_events(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<EventsQuery>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, axum::Error>>>, AppError> {
    journal_access(&auth)?;
    let after = resume_point(&query, &headers);
    let subscription = state.hub.subscribe(&journal_topic(auth.id()), after).await;
    Ok(Sse::new(into_stream(subscription)).keep_alive(KeepAlive::default()))
}
