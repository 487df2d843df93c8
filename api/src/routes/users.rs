use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use shared::Plan;

use super::auth::UserView;
use super::{ok, ApiResponse};
use crate::auth::AdminUser;
use crate::error::AppError;
use crate::services::users as user_service;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PlanRequest {
    /// `null` or empty removes the plan.
    pub plan: Option<String>,
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:id/plan", put(set_plan))
}

async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<ApiResponse<Vec<UserView>>>, AppError> {
    let users = user_service::list_users(&state.db).await?;
    Ok(ok(users.iter().map(UserView::from).collect()))
}

async fn set_plan(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<ApiResponse<UserView>>, AppError> {
    let plan = req
        .plan
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(str::parse::<Plan>)
        .transpose()?;
    let user = user_service::set_plan(&state.db, id, plan).await?;
    Ok(ok(UserView::from(&user)))
}
