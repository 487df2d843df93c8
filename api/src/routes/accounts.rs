use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::realtime::journal_topic;
use shared::{EventKind, Money};

use super::{journal_access, ok, publish, ApiResponse};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::services::accounts::{self as account_service, AccountChanges, AccountView};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateAccountRequest {
    pub account_name: String,
    pub initial_balance: Option<Money>,
    pub minimum_balance: Option<Money>,
}

#[derive(Deserialize)]
pub struct UpdateAccountRequest {
    pub account_name: Option<String>,
    pub initial_balance: Option<Money>,
    pub minimum_balance: Option<Money>,
}

#[derive(Serialize)]
pub struct DeletedAccount {
    pub id: i32,
    pub deleted_trades: u64,
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/journal/accounts", get(list_accounts).post(create_account))
        .route("/api/journal/accounts/:id", put(update_account).delete(delete_account))
        .route("/api/journal/accounts/:id/default", post(set_default))
}

async fn list_accounts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<AccountView>>>, AppError> {
    journal_access(&auth)?;
    let accounts = account_service::list_accounts(&state.db, auth.id()).await?;
    Ok(ok(accounts.iter().map(AccountView::from).collect()))
}

async fn create_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<ApiResponse<AccountView>>, AppError> {
    journal_access(&auth)?;
    let account = account_service::create_account(
        &state.db,
        auth.id(),
        &req.account_name,
        req.initial_balance.unwrap_or(Money::ZERO),
        req.minimum_balance.unwrap_or(Money::ZERO),
    )
    .await?;

    let view = AccountView::from(&account);
    publish(&state, &journal_topic(auth.id()), EventKind::AccountCreated, &view).await;
    Ok(ok(view))
}

async fn update_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<Json<ApiResponse<AccountView>>, AppError> {
    journal_access(&auth)?;
    let account = account_service::update_account(
        &state.db,
        auth.id(),
        id,
        AccountChanges {
            account_name: req.account_name,
            initial_balance: req.initial_balance,
            minimum_balance: req.minimum_balance,
        },
    )
    .await?;

    let view = AccountView::from(&account);
    publish(&state, &journal_topic(auth.id()), EventKind::AccountUpdated, &view).await;
    Ok(ok(view))
}

async fn set_default(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AccountView>>, AppError> {
    journal_access(&auth)?;
    let account = account_service::set_default_account(&state.db, auth.id(), id).await?;
    let view = AccountView::from(&account);
    publish(&state, &journal_topic(auth.id()), EventKind::AccountUpdated, &view).await;
    Ok(ok(view))
}

async fn delete_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<DeletedAccount>>, AppError> {
    journal_access(&auth)?;
    let deleted_trades = account_service::delete_account(&state.db, auth.id(), id).await?;

    let payload = json!({ "id": id, "deleted_trades": deleted_trades });
    publish(&state, &journal_topic(auth.id()), EventKind::AccountDeleted, &payload).await;
    Ok(ok(DeletedAccount { id, deleted_trades }))
}
