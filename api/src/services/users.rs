//! Users and sessions.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder,
};
use shared::entity::{sessions, users};
use shared::{Config, Plan};
use tracing::info;

use crate::auth::{hash_password, hash_token, new_session_token, verify_password};
use crate::error::{is_unique_violation, AppError, AppResult};

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub display_name: Option<&'a str>,
}

/// Create an account. Emails listed in `ADMIN_EMAILS` become admins.
pub async fn sign_up(
    db: &DatabaseConnection,
    config: &Config,
    new_user: NewUser<'_>,
) -> AppResult<users::Model> {
    let email = new_user.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email".to_string()));
    }
    if new_user.password.len() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    if find_by_email(db, &email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let display_name = new_user
        .display_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
    let role = if config.admin_emails.contains(&email) { "admin" } else { "user" };

    let now = Utc::now();
    let user = users::ActiveModel {
        email: ActiveValue::Set(email.clone()),
        display_name: ActiveValue::Set(display_name),
        password_hash: ActiveValue::Set(hash_password(new_user.password, config.password_rounds)),
        role: ActiveValue::Set(role.to_string()),
        plan: ActiveValue::Set(None),
        avatar: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            AppError::Conflict("Email already registered".to_string())
        } else {
            AppError::Database(err)
        }
    })?;

    info!("👤 New {} account: {}", role, email);
    Ok(user)
}

/// Check credentials and open a session. Returns the raw bearer token.
pub async fn sign_in(
    db: &DatabaseConnection,
    config: &Config,
    email: &str,
    password: &str,
) -> AppResult<(String, users::Model)> {
    let email = email.trim().to_lowercase();
    let user = find_by_email(db, &email)
        .await?
        .filter(|u| verify_password(password, &u.password_hash))
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let token = new_session_token();
    let now = Utc::now();
    sessions::ActiveModel {
        user_id: ActiveValue::Set(user.id),
        token_hash: ActiveValue::Set(hash_token(&token)),
        expires_at: ActiveValue::Set(now + Duration::hours(config.session_ttl_hours)),
        created_at: ActiveValue::Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("🔑 {} signed in", user.email);
    Ok((token, user))
}

pub async fn sign_out(db: &DatabaseConnection, session_id: i32) -> AppResult<()> {
    sessions::Entity::delete_by_id(session_id).exec(db).await?;
    Ok(())
}

/// Resolve a bearer token. Expired sessions are removed on sight.
pub async fn find_session_user(
    db: &DatabaseConnection,
    token: &str,
) -> AppResult<Option<(sessions::Model, users::Model)>> {
    let found = sessions::Entity::find()
        .filter(sessions::Column::TokenHash.eq(hash_token(token)))
        .find_also_related(users::Entity)
        .one(db)
        .await?;

    match found {
        Some((session, Some(user))) if session.expires_at > Utc::now() => Ok(Some((session, user))),
        Some((session, _)) => {
            session.delete(db).await?;
            Ok(None)
        }
        None => Ok(None),
    }
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> AppResult<Option<users::Model>> {
    let user = users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(db)
        .await?;
    Ok(user)
}

pub async fn get_user(db: &DatabaseConnection, user_id: i32) -> AppResult<users::Model> {
    users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

pub async fn list_users(db: &DatabaseConnection) -> AppResult<Vec<users::Model>> {
    let users = users::Entity::find()
        .order_by_asc(users::Column::Id)
        .all(db)
        .await?;
    Ok(users)
}

pub async fn set_plan(
    db: &DatabaseConnection,
    user_id: i32,
    plan: Option<Plan>,
) -> AppResult<users::Model> {
    let user = get_user(db, user_id).await?;
    let mut active: users::ActiveModel = user.into();
    active.plan = ActiveValue::Set(plan.map(|p| p.as_str().to_string()));
    active.updated_at = ActiveValue::Set(Utc::now());
    let user = active.update(db).await?;
    info!("💳 Plan for {} set to {:?}", user.email, user.plan);
    Ok(user)
}

pub async fn update_profile(
    db: &DatabaseConnection,
    user: users::Model,
    display_name: Option<String>,
    avatar: Option<String>,
) -> AppResult<users::Model> {
    let mut active: users::ActiveModel = user.into();
    if let Some(name) = display_name.map(|n| n.trim().to_string()) {
        if name.is_empty() {
            return Err(AppError::Validation("Display name cannot be empty".to_string()));
        }
        active.display_name = ActiveValue::Set(name);
    }
    if let Some(avatar) = avatar {
        active.avatar = ActiveValue::Set(Some(avatar).filter(|a| !a.is_empty()));
    }
    active.updated_at = ActiveValue::Set(Utc::now());
    Ok(active.update(db).await?)
}
