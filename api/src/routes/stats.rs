//! Statistics views over signals and journal trades. Every request
//! reloads the records and recomputes from scratch.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use shared::entity::{personal_trades, signals};
use shared::loss_reasons::{LossReason, LOSS_REASONS};
use shared::stats::{
    account_health, balance_series, compress_series, loss_reason_histogram, month_bounds,
    month_calendar, month_summary, monthly_breakdown, parse_month, weekly_breakdown,
    AccountHealth, BalancePoint, LossReasonBucket, MonthBucket, MonthCalendar, PnlRecord, Summary,
    WeekBucket,
};
use shared::Money;

use super::{accessible_channel, journal_access, ok, ApiResponse};
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::services::accounts::{self as account_service, AccountView};
use crate::services::journal::{self as journal_service, TradeFilter};
use crate::services::signals as signal_service;
use crate::state::AppState;

/// Channel holding the signals calendar, the default stats scope.
const SIGNALS_CALENDAR: &str = "calendrier";

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub channel: Option<String>,
    pub account_id: Option<i32>,
    /// `YYYY-MM`
    pub month: Option<String>,
    pub year: Option<i32>,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub account: AccountView,
    pub series: Vec<BalancePoint>,
    pub health: AccountHealth,
}

pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats/signals/summary", get(signal_summary))
        .route("/api/stats/signals/calendar", get(signal_calendar))
        .route("/api/stats/signals/weekly", get(signal_weekly))
        .route("/api/stats/signals/monthly", get(signal_monthly))
        .route("/api/stats/signals/loss-reasons", get(signal_loss_reasons))
        .route("/api/stats/journal/summary", get(journal_summary))
        .route("/api/stats/journal/calendar", get(journal_calendar))
        .route("/api/stats/journal/weekly", get(journal_weekly))
        .route("/api/stats/journal/monthly", get(journal_monthly))
        .route("/api/stats/journal/loss-reasons", get(journal_loss_reasons))
        .route("/api/stats/journal/balance", get(journal_balance))
        .route("/api/journal/loss-reasons", get(loss_reason_catalog))
}

fn today(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

/// Requested month, the current one when absent.
fn resolve_month(query: &StatsQuery, tz: &Tz) -> AppResult<(i32, u32)> {
    match query.month.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(raw) => Ok(parse_month(raw)?),
        None => {
            let now = today(tz);
            Ok((now.year(), now.month()))
        }
    }
}

fn summary_for<R: PnlRecord>(records: &[R], tz: &Tz, query: &StatsQuery) -> AppResult<Summary> {
    match query.month.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(raw) => {
            let (year, month) = parse_month(raw)?;
            Ok(month_summary(records, tz, year, month)?)
        }
        None => Ok(Summary::compute(records)),
    }
}

fn calendar_for<R: PnlRecord>(records: &[R], tz: &Tz, query: &StatsQuery) -> AppResult<MonthCalendar> {
    let (year, month) = resolve_month(query, tz)?;
    Ok(month_calendar(records, tz, year, month)?)
}

fn weekly_for<R: PnlRecord>(records: &[R], tz: &Tz, query: &StatsQuery) -> AppResult<Vec<WeekBucket>> {
    let (year, month) = resolve_month(query, tz)?;
    Ok(weekly_breakdown(records, tz, year, month, today(tz))?)
}

fn monthly_for<R: PnlRecord>(records: &[R], tz: &Tz, query: &StatsQuery) -> Vec<MonthBucket> {
    let year = query.year.unwrap_or_else(|| today(tz).year());
    monthly_breakdown(records, tz, year)
}

fn loss_reasons_for<R: PnlRecord + Clone>(
    records: &[R],
    tz: &Tz,
    query: &StatsQuery,
) -> AppResult<Vec<LossReasonBucket>> {
    match query.month.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(raw) => {
            let (year, month) = parse_month(raw)?;
            let (first, last) = month_bounds(year, month)?;
            let in_month: Vec<R> = records
                .iter()
                .filter(|r| {
                    let date = r.local_date(tz);
                    date >= first && date <= last
                })
                .cloned()
                .collect();
            Ok(loss_reason_histogram(&in_month))
        }
        None => Ok(loss_reason_histogram(records)),
    }
}

async fn load_signals(state: &AppState, auth: &AuthUser, query: &StatsQuery) -> AppResult<Vec<signals::Model>> {
    match query.channel.as_deref().filter(|c| !c.is_empty()) {
        Some(channel_id) => {
            let channel = accessible_channel(auth, channel_id)?;
            if !channel.has_signals() {
                return Err(AppError::Validation(format!("{} has no signals", channel.name)));
            }
            signal_service::all_signals(&state.db, Some(channel_id)).await
        }
        None => {
            accessible_channel(auth, SIGNALS_CALENDAR)?;
            signal_service::all_signals(&state.db, None).await
        }
    }
}

async fn load_trades(
    state: &AppState,
    auth: &AuthUser,
    query: &StatsQuery,
) -> AppResult<Vec<personal_trades::Model>> {
    journal_access(auth)?;
    if let Some(account_id) = query.account_id {
        account_service::get_account(&state.db, auth.id(), account_id).await?;
    }
    let filter = TradeFilter {
        account_id: query.account_id,
        ..Default::default()
    };
    journal_service::list_trades(&state.db, auth.id(), &filter).await
}

async fn signal_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<Summary>>, AppError> {
    let records = load_signals(&state, &auth, &query).await?;
    Ok(ok(summary_for(&records, &state.config.timezone, &query)?))
}

async fn signal_calendar(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<MonthCalendar>>, AppError> {
    let records = load_signals(&state, &auth, &query).await?;
    Ok(ok(calendar_for(&records, &state.config.timezone, &query)?))
}

async fn signal_weekly(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<Vec<WeekBucket>>>, AppError> {
    let records = load_signals(&state, &auth, &query).await?;
    Ok(ok(weekly_for(&records, &state.config.timezone, &query)?))
}

async fn signal_monthly(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<Vec<MonthBucket>>>, AppError> {
    let records = load_signals(&state, &auth, &query).await?;
    Ok(ok(monthly_for(&records, &state.config.timezone, &query)))
}

async fn signal_loss_reasons(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<Vec<LossReasonBucket>>>, AppError> {
    let records = load_signals(&state, &auth, &query).await?;
    Ok(ok(loss_reasons_for(&records, &state.config.timezone, &query)?))
}

async fn journal_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<Summary>>, AppError> {
    let records = load_trades(&state, &auth, &query).await?;
    Ok(ok(summary_for(&records, &state.config.timezone, &query)?))
}

async fn journal_calendar(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<MonthCalendar>>, AppError> {
    let records = load_trades(&state, &auth, &query).await?;
    Ok(ok(calendar_for(&records, &state.config.timezone, &query)?))
}

async fn journal_weekly(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<Vec<WeekBucket>>>, AppError> {
    let records = load_trades(&state, &auth, &query).await?;
    Ok(ok(weekly_for(&records, &state.config.timezone, &query)?))
}

async fn journal_monthly(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<Vec<MonthBucket>>>, AppError> {
    let records = load_trades(&state, &auth, &query).await?;
    Ok(ok(monthly_for(&records, &state.config.timezone, &query)))
}

async fn journal_loss_reasons(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<Vec<LossReasonBucket>>>, AppError> {
    let records = load_trades(&state, &auth, &query).await?;
    Ok(ok(loss_reasons_for(&records, &state.config.timezone, &query)?))
}

/// Running balance and drawdown of one account, the default when none given.
async fn journal_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<BalanceResponse>>, AppError> {
    journal_access(&auth)?;
    let account = match query.account_id {
        Some(id) => account_service::get_account(&state.db, auth.id(), id).await?,
        None => account_service::ensure_default_account(&state.db, auth.id()).await?,
    };
    let filter = TradeFilter {
        account_id: Some(account.id),
        ..Default::default()
    };
    let trades = journal_service::list_trades(&state.db, auth.id(), &filter).await?;

    let initial = Money::parse_lenient(&account.initial_balance);
    let minimum = Money::parse_lenient(&account.minimum_balance);
    let series = balance_series(&trades, &state.config.timezone, initial);
    let health = account_health(&series, initial, minimum);

    Ok(ok(BalanceResponse {
        account: AccountView::from(&account),
        series: compress_series(&series),
        health,
    }))
}

async fn loss_reason_catalog() -> Json<ApiResponse<&'static [LossReason]>> {
    ok(LOSS_REASONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_month_defaults_to_current() {
        let tz = Tz::Europe__Paris;
        let now = today(&tz);
        assert_eq!(resolve_month(&StatsQuery::default(), &tz).unwrap(), (now.year(), now.month()));

        let query = StatsQuery {
            month: Some("2025-02".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_month(&query, &tz).unwrap(), (2025, 2));

        let bad = StatsQuery {
            month: Some("2025-99".to_string()),
            ..Default::default()
        };
        assert!(matches!(resolve_month(&bad, &tz), Err(AppError::Validation(_))));
    }
}
