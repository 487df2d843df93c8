//! Chat token minting plus the status and health checks.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::chat_token::mint_chat_token;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TokenQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/get-token", get(get_token))
        .route("/test", get(status))
        .route("/health", get(health))
}

async fn get_token(State(state): State<AppState>, Query(query): Query<TokenQuery>) -> Response {
    let Some(user_id) = query.user_id.filter(|u| !u.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "userId requis" }))).into_response();
    };

    match mint_chat_token(&state.config.chat_api_secret, &user_id) {
        Ok(token) => {
            info!("✅ Chat token issued for {}", user_id);
            Json(json!({
                "token": token,
                "userId": user_id,
                "apiKey": state.config.chat_api_key,
            }))
            .into_response()
        }
        Err(e) => {
            error!("❌ Chat token generation failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Erreur génération token" })),
            )
                .into_response()
        }
    }
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "Chat token server running",
        "apiKey": state.config.chat_api_key,
        "status": "OK",
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = match state.db.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            error!("❌ Database ping failed: {}", e);
            "unreachable"
        }
    };
    Json(json!({
        "status": "ok",
        "database": database,
        "push_provider": state.push.name(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "build": {
            "git_hash": env!("GIT_HASH"),
            "git_branch": env!("GIT_BRANCH"),
            "build_time": env!("BUILD_TIME"),
            "profile": env!("BUILD_PROFILE"),
            "rustc": env!("RUSTC_VERSION"),
        }
    }))
}
