//! Signals feed: publication, closing and paginated history.

use askama::Template;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use shared::channels::find_channel;
use shared::entity::{messages, signals, users};
use shared::stats::{format_risk_reward, risk_reward};
use shared::templates::{SignalAnnouncement, SignalClosure};
use shared::{Money, ReactionCount, Side, SignalStatus};
use tracing::info;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::services::messages::{self as message_service, MessageInput};

pub const DEFAULT_TIMEFRAME: &str = "1 min";
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Default)]
pub struct SignalInput {
    pub side: Option<Side>,
    pub symbol: String,
    pub timeframe: Option<String>,
    pub entry: String,
    pub take_profit: String,
    pub stop_loss: String,
    pub description: String,
    pub image: Option<String>,
    pub attachment_data: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CloseInput {
    pub status: SignalStatus,
    pub pnl: Option<Money>,
    pub close_message: Option<String>,
    pub closure_image: Option<String>,
    pub loss_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SignalEdit {
    pub entry: Option<String>,
    pub take_profit: Option<String>,
    pub stop_loss: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalView {
    pub id: i32,
    pub channel_id: String,
    #[serde(rename = "type")]
    pub side: String,
    pub symbol: String,
    pub timeframe: String,
    pub entry: String,
    pub take_profit: String,
    pub stop_loss: String,
    pub risk_reward: String,
    pub description: String,
    pub image: Option<String>,
    pub attachment_data: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_name: Option<String>,
    pub status: String,
    pub pnl: Option<String>,
    pub close_message: Option<String>,
    pub closure_image: Option<String>,
    pub loss_reason: Option<String>,
    pub reactions: Vec<ReactionCount>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl SignalView {
    pub fn new(m: &signals::Model, reactions: Vec<ReactionCount>) -> Self {
        SignalView {
            id: m.id,
            channel_id: m.channel_id.clone(),
            side: m.signal_type.clone(),
            symbol: m.symbol.clone(),
            timeframe: m.timeframe.clone(),
            entry: m.entry.clone(),
            take_profit: m.take_profit.clone(),
            stop_loss: m.stop_loss.clone(),
            risk_reward: format_risk_reward(risk_reward(&m.entry, &m.take_profit, &m.stop_loss)),
            description: m.description.clone(),
            image: m.image.clone(),
            attachment_data: m.attachment_data.clone(),
            attachment_type: m.attachment_type.clone(),
            attachment_name: m.attachment_name.clone(),
            status: m.status.clone(),
            pnl: m.pnl.clone(),
            close_message: m.close_message.clone(),
            closure_image: m.closure_image.clone(),
            loss_reason: m.loss_reason.clone(),
            reactions,
            created_at: m.created_at,
            closed_at: m.closed_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalPage {
    pub signals: Vec<signals::Model>,
    /// Cursor for the next page when more rows may exist.
    pub next_before: Option<i32>,
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// Publish a signal and its announcement message in the same channel, in
/// one transaction. A partial unique index backs the one-active-signal rule.
pub async fn create_signal(
    db: &DatabaseConnection,
    channel_id: &str,
    author: &users::Model,
    input: SignalInput,
) -> AppResult<(signals::Model, messages::Model)> {
    let channel = find_channel(channel_id)?;
    if !channel.has_signals() {
        return Err(AppError::Validation(format!(
            "Channel {} does not accept signals",
            channel_id
        )));
    }
    let side = input
        .side
        .ok_or_else(|| AppError::Validation("Signal type is required".to_string()))?;
    let symbol = required(&input.symbol, "Symbol")?.to_uppercase();
    let timeframe = input
        .timeframe
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TIMEFRAME)
        .to_string();
    let entry = required(&input.entry, "Entry")?;
    let take_profit = required(&input.take_profit, "Take profit")?;
    let stop_loss = required(&input.stop_loss, "Stop loss")?;

    let duplicate = signals::Entity::find()
        .filter(signals::Column::ChannelId.eq(channel_id))
        .filter(signals::Column::Symbol.eq(symbol.as_str()))
        .filter(signals::Column::Timeframe.eq(timeframe.as_str()))
        .filter(signals::Column::Status.eq(SignalStatus::Active.as_str()))
        .one(db)
        .await?;
    if let Some(existing) = duplicate {
        return Err(AppError::Conflict(format!(
            "Signal {} is already active for {} {}",
            existing.id, symbol, timeframe
        )));
    }
    let already_active = |err: DbErr| {
        if is_unique_violation(&err) {
            AppError::Conflict(format!("A signal is already active for {} {}", symbol, timeframe))
        } else {
            AppError::Database(err)
        }
    };

    let txn = db.begin().await?;
    let signal = signals::ActiveModel {
        channel_id: ActiveValue::Set(channel_id.to_string()),
        author_id: ActiveValue::Set(Some(author.id)),
        signal_type: ActiveValue::Set(side.as_str().to_string()),
        symbol: ActiveValue::Set(symbol.clone()),
        timeframe: ActiveValue::Set(timeframe.clone()),
        entry: ActiveValue::Set(entry),
        take_profit: ActiveValue::Set(take_profit),
        stop_loss: ActiveValue::Set(stop_loss),
        description: ActiveValue::Set(input.description.trim().to_string()),
        image: ActiveValue::Set(input.image),
        attachment_data: ActiveValue::Set(input.attachment_data.clone()),
        attachment_type: ActiveValue::Set(input.attachment_type.clone()),
        attachment_name: ActiveValue::Set(input.attachment_name.clone()),
        status: ActiveValue::Set(SignalStatus::Active.as_str().to_string()),
        pnl: ActiveValue::Set(None),
        close_message: ActiveValue::Set(None),
        closure_image: ActiveValue::Set(None),
        loss_reason: ActiveValue::Set(None),
        created_at: ActiveValue::Set(Utc::now()),
        closed_at: ActiveValue::Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(already_active)?;

    let content = SignalAnnouncement {
        signal_id: signal.id,
        side: signal.signal_type.clone(),
        symbol: signal.symbol.clone(),
        entry: signal.entry.clone(),
        take_profit: signal.take_profit.clone(),
        stop_loss: signal.stop_loss.clone(),
        risk_reward: format_risk_reward(risk_reward(
            &signal.entry,
            &signal.take_profit,
            &signal.stop_loss,
        )),
        timeframe: signal.timeframe.clone(),
    }
    .render()
    .map_err(anyhow::Error::from)?;

    let announcement = message_service::create_message(
        &txn,
        channel_id,
        author,
        MessageInput {
            content,
            attachment_data: input.attachment_data,
            attachment_type: input.attachment_type,
            attachment_name: input.attachment_name,
        },
    )
    .await?;
    txn.commit().await?;

    info!("🚀 Signal {} {} {} published in {}", signal.id, signal.signal_type, signal.symbol, channel_id);
    Ok((signal, announcement))
}

pub async fn get_signal(db: &DatabaseConnection, signal_id: i32) -> AppResult<signals::Model> {
    signals::Entity::find_by_id(signal_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Signal {} not found", signal_id)))
}

/// Newest first, at most `limit` rows with id below `before`.
pub async fn list_signals(
    db: &DatabaseConnection,
    channel_id: &str,
    status: Option<SignalStatus>,
    before: Option<i32>,
    limit: u64,
) -> AppResult<SignalPage> {
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    let mut query = signals::Entity::find().filter(signals::Column::ChannelId.eq(channel_id));
    if let Some(status) = status {
        query = query.filter(signals::Column::Status.eq(status.as_str()));
    }
    if let Some(before) = before {
        query = query.filter(signals::Column::Id.lt(before));
    }

    let mut rows = query
        .order_by_desc(signals::Column::Id)
        .limit(limit + 1)
        .all(db)
        .await?;

    let has_more = rows.len() as u64 > limit;
    rows.truncate(limit as usize);
    let next_before = if has_more { rows.iter().map(|s| s.id).min() } else { None };
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    Ok(SignalPage {
        signals: rows,
        next_before,
    })
}

/// Every signal, optionally for one channel. Feeds the statistics views.
pub async fn all_signals(
    db: &DatabaseConnection,
    channel_id: Option<&str>,
) -> AppResult<Vec<signals::Model>> {
    let mut query = signals::Entity::find();
    if let Some(channel_id) = channel_id {
        query = query.filter(signals::Column::ChannelId.eq(channel_id));
    }
    Ok(query.order_by_asc(signals::Column::CreatedAt).all(db).await?)
}

fn closure_result(status: SignalStatus) -> &'static str {
    match status {
        SignalStatus::Win => "🟢 GAGNANT",
        SignalStatus::Loss => "🔴 PERDANT",
        _ => "🔵 BREAK-EVEN",
    }
}

/// Signed P&L for a closing status: wins positive, losses negative,
/// break-even zero unless given.
fn normalize_pnl(status: SignalStatus, pnl: Option<Money>) -> AppResult<Money> {
    match (status, pnl) {
        (SignalStatus::Win, Some(p)) => Ok(p.abs()),
        (SignalStatus::Loss, Some(p)) => Ok(-p.abs()),
        (SignalStatus::BreakEven, p) => Ok(p.unwrap_or(Money::ZERO)),
        (SignalStatus::Win | SignalStatus::Loss, None) => Err(AppError::Validation(
            "P&L is required to close a signal as WIN or LOSS".to_string(),
        )),
        (SignalStatus::Active, _) => Err(AppError::Validation(
            "Closing status must be WIN, LOSS or BE".to_string(),
        )),
    }
}

/// Move an ACTIVE signal to its final status and post the closure message.
/// The status change only applies while the row is still ACTIVE, so of two
/// racing closes exactly one succeeds.
pub async fn close_signal(
    db: &DatabaseConnection,
    signal_id: i32,
    closer: &users::Model,
    input: CloseInput,
) -> AppResult<(signals::Model, messages::Model)> {
    let signal = get_signal(db, signal_id).await?;
    if signal.status != SignalStatus::Active.as_str() {
        return Err(AppError::Conflict(format!(
            "Signal {} is already closed ({})",
            signal_id, signal.status
        )));
    }
    if !input.status.is_terminal() {
        return Err(AppError::Validation(
            "Closing status must be WIN, LOSS or BE".to_string(),
        ));
    }
    let pnl = normalize_pnl(input.status, input.pnl)?;
    let loss_reason = match input.status {
        SignalStatus::Loss => input.loss_reason.filter(|r| !r.trim().is_empty()),
        _ => None,
    };
    let close_message = input.close_message.filter(|m| !m.trim().is_empty());

    let txn = db.begin().await?;
    let closed = signals::Entity::update_many()
        .col_expr(signals::Column::Status, Expr::value(input.status.as_str()))
        .col_expr(signals::Column::Pnl, Expr::value(Some(pnl.to_storage())))
        .col_expr(signals::Column::CloseMessage, Expr::value(close_message))
        .col_expr(signals::Column::ClosureImage, Expr::value(input.closure_image))
        .col_expr(signals::Column::LossReason, Expr::value(loss_reason))
        .col_expr(signals::Column::ClosedAt, Expr::value(Some(Utc::now())))
        .filter(signals::Column::Id.eq(signal_id))
        .filter(signals::Column::Status.eq(SignalStatus::Active.as_str()))
        .exec(&txn)
        .await?;
    if closed.rows_affected == 0 {
        // closed by someone else since the read above
        return Err(AppError::Conflict(format!("Signal {} is already closed", signal_id)));
    }
    let signal = signals::Entity::find_by_id(signal_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Signal {} not found", signal_id)))?;

    let content = SignalClosure {
        signal_id: signal.id,
        side: signal.signal_type.clone(),
        symbol: signal.symbol.clone(),
        result: closure_result(input.status).to_string(),
        pnl: (input.status != SignalStatus::BreakEven).then(|| pnl.signed_display()),
    }
    .render()
    .map_err(anyhow::Error::from)?;

    let message = message_service::create_message(
        &txn,
        &signal.channel_id,
        closer,
        MessageInput {
            content,
            ..Default::default()
        },
    )
    .await?;
    txn.commit().await?;

    info!("🏁 Signal {} closed as {} ({})", signal.id, signal.status, pnl.signed_display());
    Ok((signal, message))
}

pub async fn edit_signal(
    db: &DatabaseConnection,
    signal_id: i32,
    edit: SignalEdit,
) -> AppResult<signals::Model> {
    let signal = get_signal(db, signal_id).await?;
    let mut active: signals::ActiveModel = signal.into();
    if let Some(entry) = edit.entry {
        active.entry = ActiveValue::Set(required(&entry, "Entry")?);
    }
    if let Some(tp) = edit.take_profit {
        active.take_profit = ActiveValue::Set(required(&tp, "Take profit")?);
    }
    if let Some(sl) = edit.stop_loss {
        active.stop_loss = ActiveValue::Set(required(&sl, "Stop loss")?);
    }
    if let Some(description) = edit.description {
        active.description = ActiveValue::Set(description.trim().to_string());
    }
    Ok(active.update(db).await?)
}

pub async fn delete_signal(db: &DatabaseConnection, signal_id: i32) -> AppResult<signals::Model> {
    let signal = get_signal(db, signal_id).await?;
    signals::Entity::delete_by_id(signal.id).exec(db).await?;
    info!("🗑️ Signal {} deleted", signal_id);
    Ok(signal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn test_normalize_pnl_signs() {
        assert_eq!(normalize_pnl(SignalStatus::Win, Some(m("-50"))).unwrap(), m("50"));
        assert_eq!(normalize_pnl(SignalStatus::Loss, Some(m("30"))).unwrap(), m("-30"));
        assert_eq!(normalize_pnl(SignalStatus::BreakEven, None).unwrap(), Money::ZERO);
        assert!(normalize_pnl(SignalStatus::Win, None).is_err());
        assert!(normalize_pnl(SignalStatus::Active, Some(m("1"))).is_err());
    }

    #[test]
    fn test_closure_result_labels() {
        assert_eq!(closure_result(SignalStatus::Win), "🟢 GAGNANT");
        assert_eq!(closure_result(SignalStatus::Loss), "🔴 PERDANT");
        assert_eq!(closure_result(SignalStatus::BreakEven), "🔵 BREAK-EVEN");
    }
}
