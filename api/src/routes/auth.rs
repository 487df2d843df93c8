use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::channels::{accessible_channels, Channel};
use shared::entity::users;

use super::{ok, ApiResponse};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::services::users::{self as user_service, NewUser};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ProfileRequest {
    pub display_name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i32,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub plan: Option<String>,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&users::Model> for UserView {
    fn from(u: &users::Model) -> Self {
        UserView {
            id: u.id,
            email: u.email.clone(),
            display_name: u.display_name.clone(),
            role: u.role.clone(),
            plan: u.plan.clone(),
            avatar: u.avatar.clone(),
            created_at: u.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserView,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: UserView,
    pub channels: Vec<&'static Channel>,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/signout", post(sign_out))
        .route("/api/auth/me", get(me))
        .route("/api/auth/profile", put(update_profile))
}

async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, AppError> {
    user_service::sign_up(
        &state.db,
        &state.config,
        NewUser {
            email: &req.email,
            password: &req.password,
            display_name: req.display_name.as_deref(),
        },
    )
    .await?;
    let (token, user) = user_service::sign_in(&state.db, &state.config, &req.email, &req.password).await?;
    Ok(ok(SessionResponse {
        token,
        user: UserView::from(&user),
    }))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, AppError> {
    let (token, user) = user_service::sign_in(&state.db, &state.config, &req.email, &req.password).await?;
    Ok(ok(SessionResponse {
        token,
        user: UserView::from(&user),
    }))
}

async fn sign_out(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<()>>, AppError> {
    user_service::sign_out(&state.db, auth.session_id).await?;
    Ok(ok(()))
}

async fn me(auth: AuthUser) -> Result<Json<ApiResponse<MeResponse>>, AppError> {
    Ok(ok(MeResponse {
        user: UserView::from(&auth.user),
        channels: accessible_channels(auth.plan(), auth.is_admin()),
    }))
}

async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<ApiResponse<UserView>>, AppError> {
    let user = user_service::update_profile(&state.db, auth.user, req.display_name, req.avatar).await?;
    Ok(ok(UserView::from(&user)))
}
