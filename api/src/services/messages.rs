//! Channel chat messages.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use shared::entity::{messages, users};
use shared::templates::{markdown_to_html, referenced_signal_id};
use shared::{AuthorType, ReactionCount};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct MessageInput {
    pub content: String,
    pub attachment_data: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: i32,
    pub channel_id: String,
    pub user_id: Option<i32>,
    pub content: String,
    pub content_html: String,
    pub author: String,
    pub author_type: String,
    pub author_avatar: Option<String>,
    pub attachment_data: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_name: Option<String>,
    /// Set on signal announcements.
    pub signal_id: Option<i32>,
    pub reactions: Vec<ReactionCount>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MessageView {
    pub fn new(m: &messages::Model, reactions: Vec<ReactionCount>) -> Self {
        MessageView {
            id: m.id,
            channel_id: m.channel_id.clone(),
            user_id: m.user_id,
            content: m.content.clone(),
            content_html: markdown_to_html(&m.content),
            author: m.author.clone(),
            author_type: m.author_type.clone(),
            author_avatar: m.author_avatar.clone(),
            attachment_data: m.attachment_data.clone(),
            attachment_type: m.attachment_type.clone(),
            attachment_name: m.attachment_name.clone(),
            signal_id: referenced_signal_id(&m.content),
            reactions,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Last `limit` messages of a channel, oldest first.
pub async fn list_tail(
    db: &DatabaseConnection,
    channel_id: &str,
    limit: u64,
) -> AppResult<Vec<messages::Model>> {
    let mut tail = messages::Entity::find()
        .filter(messages::Column::ChannelId.eq(channel_id))
        .order_by_desc(messages::Column::CreatedAt)
        .order_by_desc(messages::Column::Id)
        .limit(limit)
        .all(db)
        .await?;
    tail.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(tail)
}

pub async fn get_message(db: &DatabaseConnection, message_id: i32) -> AppResult<messages::Model> {
    messages::Entity::find_by_id(message_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))
}

pub async fn create_message<C: ConnectionTrait>(
    db: &C,
    channel_id: &str,
    author: &users::Model,
    input: MessageInput,
) -> AppResult<messages::Model> {
    let content = input.content.trim().to_string();
    if content.is_empty() && input.attachment_data.is_none() {
        return Err(AppError::Validation("Message is empty".to_string()));
    }
    let author_type = if author.is_admin() { AuthorType::Admin } else { AuthorType::User };

    let message = messages::ActiveModel {
        channel_id: ActiveValue::Set(channel_id.to_string()),
        user_id: ActiveValue::Set(Some(author.id)),
        content: ActiveValue::Set(content),
        author: ActiveValue::Set(author.display_name.clone()),
        author_type: ActiveValue::Set(author_type.as_str().to_string()),
        author_avatar: ActiveValue::Set(author.avatar.clone()),
        attachment_data: ActiveValue::Set(input.attachment_data),
        attachment_type: ActiveValue::Set(input.attachment_type),
        attachment_name: ActiveValue::Set(input.attachment_name),
        created_at: ActiveValue::Set(Utc::now()),
        updated_at: ActiveValue::Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::debug!("💬 Message {} in {} by {}", message.id, channel_id, message.author);
    Ok(message)
}

fn ensure_can_edit(message: &messages::Model, user: &users::Model) -> AppResult<()> {
    if user.is_admin() || message.user_id == Some(user.id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not your message".to_string()))
    }
}

pub async fn update_message(
    db: &DatabaseConnection,
    message_id: i32,
    editor: &users::Model,
    content: &str,
) -> AppResult<messages::Model> {
    let message = get_message(db, message_id).await?;
    ensure_can_edit(&message, editor)?;
    let content = content.trim();
    if content.is_empty() && message.attachment_data.is_none() {
        return Err(AppError::Validation("Message is empty".to_string()));
    }

    let mut active: messages::ActiveModel = message.into();
    active.content = ActiveValue::Set(content.to_string());
    active.updated_at = ActiveValue::Set(Some(Utc::now()));
    Ok(active.update(db).await?)
}

pub async fn delete_message(
    db: &DatabaseConnection,
    message_id: i32,
    user: &users::Model,
) -> AppResult<messages::Model> {
    let message = get_message(db, message_id).await?;
    ensure_can_edit(&message, user)?;
    messages::Entity::delete_by_id(message.id).exec(db).await?;
    Ok(message)
}
