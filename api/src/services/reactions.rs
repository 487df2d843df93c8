//! Emoji reactions on messages and signals, toggled per user.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder,
};
use shared::entity::{messages, reactions, signals};
use serde_json::json;
use shared::{ReactionCount, ReactionTally, ReactionTarget};
use std::collections::HashMap;

use crate::error::{is_unique_violation, AppError, AppResult};

const MAX_EMOJI_LEN: usize = 32;

async fn ensure_target(db: &DatabaseConnection, kind: ReactionTarget, target_id: i32) -> AppResult<()> {
    let exists = match kind {
        ReactionTarget::Message => messages::Entity::find_by_id(target_id).one(db).await?.is_some(),
        ReactionTarget::Signal => signals::Entity::find_by_id(target_id).one(db).await?.is_some(),
    };
    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("{} {} not found", kind.as_str(), target_id)))
    }
}

/// Add the reaction, or remove it if the user already had it. Returns
/// whether the user reacts after the call.
pub async fn toggle(
    db: &DatabaseConnection,
    kind: ReactionTarget,
    target_id: i32,
    emoji: &str,
    user_id: i32,
) -> AppResult<bool> {
    let emoji = emoji.trim();
    if emoji.is_empty() || emoji.len() > MAX_EMOJI_LEN {
        return Err(AppError::Validation("Invalid emoji".to_string()));
    }
    ensure_target(db, kind, target_id).await?;

    let existing = reactions::Entity::find()
        .filter(reactions::Column::TargetKind.eq(kind.as_str()))
        .filter(reactions::Column::TargetId.eq(target_id))
        .filter(reactions::Column::Emoji.eq(emoji))
        .filter(reactions::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    match existing {
        Some(reaction) => {
            reaction.delete(db).await?;
            Ok(false)
        }
        None => {
            let inserted = reactions::ActiveModel {
                target_kind: ActiveValue::Set(kind.as_str().to_string()),
                target_id: ActiveValue::Set(target_id),
                emoji: ActiveValue::Set(emoji.to_string()),
                user_id: ActiveValue::Set(user_id),
                created_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await;
            match inserted {
                Ok(_) => Ok(true),
                // a concurrent toggle from the same user got there first
                Err(err) if is_unique_violation(&err) => Ok(true),
                Err(err) => Err(err.into()),
            }
        }
    }
}

/// Per-target tallies, emojis in the order they were first used.
pub async fn counts(
    db: &DatabaseConnection,
    kind: ReactionTarget,
    target_ids: &[i32],
    caller: i32,
) -> AppResult<HashMap<i32, Vec<ReactionCount>>> {
    if target_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = reactions::Entity::find()
        .filter(reactions::Column::TargetKind.eq(kind.as_str()))
        .filter(reactions::Column::TargetId.is_in(target_ids.iter().copied()))
        .order_by_asc(reactions::Column::Id)
        .all(db)
        .await?;

    let mut out: HashMap<i32, Vec<ReactionCount>> = HashMap::new();
    for row in rows {
        let tallies = out.entry(row.target_id).or_default();
        match tallies.iter_mut().find(|t| t.emoji == row.emoji) {
            Some(tally) => {
                tally.count += 1;
                tally.reacted |= row.user_id == caller;
            }
            None => tallies.push(ReactionCount {
                emoji: row.emoji,
                count: 1,
                reacted: row.user_id == caller,
            }),
        }
    }
    Ok(out)
}

pub async fn counts_for(
    db: &DatabaseConnection,
    kind: ReactionTarget,
    target_id: i32,
    caller: i32,
) -> AppResult<Vec<ReactionCount>> {
    Ok(counts(db, kind, &[target_id], caller)
        .await?
        .remove(&target_id)
        .unwrap_or_default())
}

/// `reaction_changed` payload: tallies only, without the actor's
/// `reacted` flag.
pub fn changed_payload(kind: ReactionTarget, target_id: i32, counts: &[ReactionCount]) -> serde_json::Value {
    let tallies: Vec<ReactionTally> = counts.iter().map(ReactionTally::from).collect();
    json!({ "target": kind.as_str(), "target_id": target_id, "reactions": tallies })
}

/// Drop every reaction attached to a deleted target.
pub async fn clear(db: &DatabaseConnection, kind: ReactionTarget, target_id: i32) -> AppResult<()> {
    reactions::Entity::delete_many()
        .filter(reactions::Column::TargetKind.eq(kind.as_str()))
        .filter(reactions::Column::TargetId.eq(target_id))
        .exec(db)
        .await?;
    Ok(())
}
