use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use shared::realtime::journal_topic;
use shared::{EventKind, Money, Outcome, Side};

use super::{journal_access, ok, publish, ApiResponse};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::services::journal::{self as journal_service, TradeFilter, TradeInput, TradeView};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TradeRequest {
    pub account_id: Option<i32>,
    pub date: NaiveDate,
    pub entry_time: Option<String>,
    pub symbol: String,
    #[serde(rename = "type")]
    pub side: String,
    #[serde(default)]
    pub entry: String,
    #[serde(default)]
    pub exit: String,
    pub stop_loss: Option<String>,
    #[serde(default)]
    pub pnl: String,
    pub status: String,
    #[serde(default, alias = "lossReasons")]
    pub loss_reasons: Vec<String>,
    pub notes: Option<String>,
    pub image1: Option<String>,
    pub image2: Option<String>,
}

impl TradeRequest {
    fn into_input(self) -> Result<TradeInput, AppError> {
        let side: Side = self.side.parse()?;
        let status: Outcome = self.status.parse()?;
        Ok(TradeInput {
            account_id: self.account_id,
            date: self.date,
            entry_time: self.entry_time,
            symbol: self.symbol,
            side,
            entry: self.entry,
            exit: self.exit,
            stop_loss: self.stop_loss,
            pnl: Money::parse_lenient(&self.pnl),
            status,
            loss_reasons: self.loss_reasons,
            notes: self.notes,
            image1: self.image1,
            image2: self.image2,
        })
    }
}

#[derive(Deserialize)]
pub struct TradeListQuery {
    pub account_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub fn journal_routes() -> Router<AppState> {
    Router::new()
        .route("/api/journal/trades", get(list_trades).post(create_trade))
        .route(
            "/api/journal/trades/:id",
            get(get_trade).put(update_trade).delete(delete_trade),
        )
}

async fn list_trades(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TradeListQuery>,
) -> Result<Json<ApiResponse<Vec<TradeView>>>, AppError> {
    journal_access(&auth)?;
    let filter = TradeFilter {
        account_id: query.account_id,
        from: query.from,
        to: query.to,
    };
    let trades = journal_service::list_trades(&state.db, auth.id(), &filter).await?;
    Ok(ok(trades.iter().map(TradeView::from).collect()))
}

async fn get_trade(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TradeView>>, AppError> {
    journal_access(&auth)?;
    let trade = journal_service::get_trade(&state.db, auth.id(), id).await?;
    Ok(ok(TradeView::from(&trade)))
}

async fn create_trade(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<TradeRequest>,
) -> Result<Json<ApiResponse<TradeView>>, AppError> {
    journal_access(&auth)?;
    let trade = journal_service::create_trade(&state.db, auth.id(), req.into_input()?).await?;
    let view = TradeView::from(&trade);
    publish(&state, &journal_topic(auth.id()), EventKind::TradeCreated, &view).await;
    Ok(ok(view))
}

async fn update_trade(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<TradeRequest>,
) -> Result<Json<ApiResponse<TradeView>>, AppError> {
    journal_access(&auth)?;
    let trade = journal_service::update_trade(&state.db, auth.id(), id, req.into_input()?).await?;
    let view = TradeView::from(&trade);
    publish(&state, &journal_topic(auth.id()), EventKind::TradeUpdated, &view).await;
    Ok(ok(view))
}

async fn delete_trade(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    journal_access(&auth)?;
    journal_service::delete_trade(&state.db, auth.id(), id).await?;
    publish(&state, &journal_topic(auth.id()), EventKind::TradeDeleted, &json!({ "id": id })).await;
    Ok(ok(()))
}
