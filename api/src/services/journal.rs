//! Personal trades recorded against a user's accounts.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use serde::Serialize;
use shared::entity::personal_trades;
use shared::{Money, Outcome, Side};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::services::accounts;

#[derive(Debug, Clone)]
pub struct TradeInput {
    /// Defaults to the user's default account.
    pub account_id: Option<i32>,
    pub date: NaiveDate,
    pub entry_time: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub entry: String,
    pub exit: String,
    pub stop_loss: Option<String>,
    pub pnl: Money,
    pub status: Outcome,
    pub loss_reasons: Vec<String>,
    pub notes: Option<String>,
    pub image1: Option<String>,
    pub image2: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    pub account_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeView {
    pub id: i32,
    pub account_id: i32,
    pub date: NaiveDate,
    pub entry_time: Option<String>,
    pub symbol: String,
    #[serde(rename = "type")]
    pub side: String,
    pub entry: String,
    pub exit: String,
    pub stop_loss: Option<String>,
    pub pnl: Money,
    pub status: String,
    pub loss_reasons: Vec<String>,
    pub notes: Option<String>,
    pub image1: Option<String>,
    pub image2: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&personal_trades::Model> for TradeView {
    fn from(m: &personal_trades::Model) -> Self {
        TradeView {
            id: m.id,
            account_id: m.account_id,
            date: m.trade_date,
            entry_time: m.entry_time.clone(),
            symbol: m.symbol.clone(),
            side: m.side.clone(),
            entry: m.entry.clone(),
            exit: m.exit.clone(),
            stop_loss: m.stop_loss.clone(),
            pnl: Money::parse_lenient(&m.pnl),
            status: m.status.clone(),
            loss_reasons: m.loss_reason_list(),
            notes: m.notes.clone(),
            image1: m.image1.clone(),
            image2: m.image2.clone(),
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

struct CleanTrade {
    symbol: String,
    entry_time: Option<String>,
    loss_reasons: Option<String>,
}

fn validate(input: &TradeInput) -> AppResult<CleanTrade> {
    let symbol = input.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AppError::Validation("Symbol is required".to_string()));
    }

    let entry_time = match input.entry_time.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(t) => {
            NaiveTime::parse_from_str(t, "%H:%M").map_err(|_| {
                AppError::Validation(format!("Invalid entry time {} (expected HH:MM)", t))
            })?;
            Some(t.to_string())
        }
    };

    // Reasons only make sense on a loss.
    let reasons: Vec<&str> = input
        .loss_reasons
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    let loss_reasons = if input.status == Outcome::Loss && !reasons.is_empty() {
        Some(serde_json::to_string(&reasons).map_err(anyhow::Error::from)?)
    } else {
        None
    };

    Ok(CleanTrade {
        symbol,
        entry_time,
        loss_reasons,
    })
}

async fn resolve_account(db: &DatabaseConnection, user_id: i32, account_id: Option<i32>) -> AppResult<i32> {
    let account = match account_id {
        Some(id) => accounts::get_account(db, user_id, id).await?,
        None => accounts::ensure_default_account(db, user_id).await?,
    };
    Ok(account.id)
}

/// Newest first.
pub async fn list_trades(
    db: &DatabaseConnection,
    user_id: i32,
    filter: &TradeFilter,
) -> AppResult<Vec<personal_trades::Model>> {
    let mut query = personal_trades::Entity::find()
        .filter(personal_trades::Column::UserId.eq(user_id));
    if let Some(account_id) = filter.account_id {
        query = query.filter(personal_trades::Column::AccountId.eq(account_id));
    }
    if let Some(from) = filter.from {
        query = query.filter(personal_trades::Column::TradeDate.gte(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(personal_trades::Column::TradeDate.lte(to));
    }
    let trades = query
        .order_by_desc(personal_trades::Column::TradeDate)
        .order_by_desc(personal_trades::Column::EntryTime)
        .order_by_desc(personal_trades::Column::Id)
        .all(db)
        .await?;
    Ok(trades)
}

pub async fn get_trade(
    db: &DatabaseConnection,
    user_id: i32,
    trade_id: i32,
) -> AppResult<personal_trades::Model> {
    personal_trades::Entity::find_by_id(trade_id)
        .filter(personal_trades::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Trade {} not found", trade_id)))
}

pub async fn create_trade(
    db: &DatabaseConnection,
    user_id: i32,
    input: TradeInput,
) -> AppResult<personal_trades::Model> {
    let clean = validate(&input)?;
    let account_id = resolve_account(db, user_id, input.account_id).await?;

    let now = Utc::now();
    let trade = personal_trades::ActiveModel {
        user_id: ActiveValue::Set(user_id),
        account_id: ActiveValue::Set(account_id),
        trade_date: ActiveValue::Set(input.date),
        entry_time: ActiveValue::Set(clean.entry_time),
        symbol: ActiveValue::Set(clean.symbol),
        side: ActiveValue::Set(input.side.as_str().to_string()),
        entry: ActiveValue::Set(input.entry),
        exit: ActiveValue::Set(input.exit),
        stop_loss: ActiveValue::Set(input.stop_loss),
        pnl: ActiveValue::Set(input.pnl.to_storage()),
        status: ActiveValue::Set(input.status.as_str().to_string()),
        loss_reasons: ActiveValue::Set(clean.loss_reasons),
        notes: ActiveValue::Set(input.notes),
        image1: ActiveValue::Set(input.image1),
        image2: ActiveValue::Set(input.image2),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        "📝 Trade {} {} {} recorded for user {} ({})",
        trade.id, trade.side, trade.symbol, user_id, trade.status
    );
    Ok(trade)
}

pub async fn update_trade(
    db: &DatabaseConnection,
    user_id: i32,
    trade_id: i32,
    input: TradeInput,
) -> AppResult<personal_trades::Model> {
    let existing = get_trade(db, user_id, trade_id).await?;
    let clean = validate(&input)?;
    let account_id = match input.account_id {
        Some(id) => resolve_account(db, user_id, Some(id)).await?,
        None => existing.account_id,
    };

    let mut active: personal_trades::ActiveModel = existing.into();
    active.account_id = ActiveValue::Set(account_id);
    active.trade_date = ActiveValue::Set(input.date);
    active.entry_time = ActiveValue::Set(clean.entry_time);
    active.symbol = ActiveValue::Set(clean.symbol);
    active.side = ActiveValue::Set(input.side.as_str().to_string());
    active.entry = ActiveValue::Set(input.entry);
    active.exit = ActiveValue::Set(input.exit);
    active.stop_loss = ActiveValue::Set(input.stop_loss);
    active.pnl = ActiveValue::Set(input.pnl.to_storage());
    active.status = ActiveValue::Set(input.status.as_str().to_string());
    active.loss_reasons = ActiveValue::Set(clean.loss_reasons);
    active.notes = ActiveValue::Set(input.notes);
    active.image1 = ActiveValue::Set(input.image1);
    active.image2 = ActiveValue::Set(input.image2);
    active.updated_at = ActiveValue::Set(Utc::now());
    Ok(active.update(db).await?)
}

pub async fn delete_trade(db: &DatabaseConnection, user_id: i32, trade_id: i32) -> AppResult<()> {
    let trade = get_trade(db, user_id, trade_id).await?;
    personal_trades::Entity::delete_by_id(trade.id).exec(db).await?;
    info!("🗑️ Trade {} deleted for user {}", trade_id, user_id);
    Ok(())
}
