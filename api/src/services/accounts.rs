//! Trading accounts of the personal journal.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Serialize;
use shared::entity::{personal_trades, user_accounts};
use shared::Money;
use tracing::info;

use crate::error::{is_unique_violation, AppError, AppResult};

pub const DEFAULT_ACCOUNT_NAME: &str = "Compte Principal";

#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: i32,
    pub account_name: String,
    pub initial_balance: Money,
    pub minimum_balance: Money,
    pub is_default: bool,
}

impl From<&user_accounts::Model> for AccountView {
    fn from(m: &user_accounts::Model) -> Self {
        AccountView {
            id: m.id,
            account_name: m.account_name.clone(),
            initial_balance: Money::parse_lenient(&m.initial_balance),
            minimum_balance: Money::parse_lenient(&m.minimum_balance),
            is_default: m.is_default,
        }
    }
}

/// The user's default account, created on first use.
pub async fn ensure_default_account(
    db: &DatabaseConnection,
    user_id: i32,
) -> AppResult<user_accounts::Model> {
    let existing = user_accounts::Entity::find()
        .filter(user_accounts::Column::UserId.eq(user_id))
        .filter(user_accounts::Column::IsDefault.eq(true))
        .one(db)
        .await?;
    if let Some(account) = existing {
        return Ok(account);
    }

    match insert_default_account(db, user_id).await {
        Ok(account) => {
            info!("📒 Created default account for user {}", user_id);
            Ok(account)
        }
        // another request created it between the lookup and the insert
        Err(err) if is_unique_violation(&err) => user_accounts::Entity::find()
            .filter(user_accounts::Column::UserId.eq(user_id))
            .filter(user_accounts::Column::IsDefault.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| AppError::Database(err)),
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn insert_default_account(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<user_accounts::Model, DbErr> {
    let now = Utc::now();
    user_accounts::ActiveModel {
        user_id: ActiveValue::Set(user_id),
        account_name: ActiveValue::Set(DEFAULT_ACCOUNT_NAME.to_string()),
        initial_balance: ActiveValue::Set(Money::ZERO.to_storage()),
        minimum_balance: ActiveValue::Set(Money::ZERO.to_storage()),
        is_default: ActiveValue::Set(true),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Default account first, then by name.
pub async fn list_accounts(
    db: &DatabaseConnection,
    user_id: i32,
) -> AppResult<Vec<user_accounts::Model>> {
    ensure_default_account(db, user_id).await?;
    let accounts = user_accounts::Entity::find()
        .filter(user_accounts::Column::UserId.eq(user_id))
        .order_by_desc(user_accounts::Column::IsDefault)
        .order_by_asc(user_accounts::Column::AccountName)
        .all(db)
        .await?;
    Ok(accounts)
}

pub async fn get_account(
    db: &DatabaseConnection,
    user_id: i32,
    account_id: i32,
) -> AppResult<user_accounts::Model> {
    user_accounts::Entity::find_by_id(account_id)
        .filter(user_accounts::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Account {} not found", account_id)))
}

async fn name_taken(
    db: &DatabaseConnection,
    user_id: i32,
    name: &str,
    except: Option<i32>,
) -> AppResult<bool> {
    let mut query = user_accounts::Entity::find()
        .filter(user_accounts::Column::UserId.eq(user_id))
        .filter(user_accounts::Column::AccountName.eq(name));
    if let Some(id) = except {
        query = query.filter(user_accounts::Column::Id.ne(id));
    }
    Ok(query.one(db).await?.is_some())
}

fn clean_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Account name is required".to_string()));
    }
    Ok(name.to_string())
}

pub async fn create_account(
    db: &DatabaseConnection,
    user_id: i32,
    name: &str,
    initial_balance: Money,
    minimum_balance: Money,
) -> AppResult<user_accounts::Model> {
    let name = clean_name(name)?;
    ensure_default_account(db, user_id).await?;
    if name_taken(db, user_id, &name, None).await? {
        return Err(AppError::Conflict(format!("Account '{}' already exists", name)));
    }

    let now = Utc::now();
    let account = user_accounts::ActiveModel {
        user_id: ActiveValue::Set(user_id),
        account_name: ActiveValue::Set(name),
        initial_balance: ActiveValue::Set(initial_balance.to_storage()),
        minimum_balance: ActiveValue::Set(minimum_balance.to_storage()),
        is_default: ActiveValue::Set(false),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("📒 Account '{}' created for user {}", account.account_name, user_id);
    Ok(account)
}

#[derive(Debug, Default)]
pub struct AccountChanges {
    pub account_name: Option<String>,
    pub initial_balance: Option<Money>,
    pub minimum_balance: Option<Money>,
}

pub async fn update_account(
    db: &DatabaseConnection,
    user_id: i32,
    account_id: i32,
    changes: AccountChanges,
) -> AppResult<user_accounts::Model> {
    let account = get_account(db, user_id, account_id).await?;
    let mut active: user_accounts::ActiveModel = account.into();

    if let Some(name) = changes.account_name {
        let name = clean_name(&name)?;
        if name_taken(db, user_id, &name, Some(account_id)).await? {
            return Err(AppError::Conflict(format!("Account '{}' already exists", name)));
        }
        active.account_name = ActiveValue::Set(name);
    }
    if let Some(initial) = changes.initial_balance {
        active.initial_balance = ActiveValue::Set(initial.to_storage());
    }
    if let Some(minimum) = changes.minimum_balance {
        active.minimum_balance = ActiveValue::Set(minimum.to_storage());
    }
    active.updated_at = ActiveValue::Set(Utc::now());
    Ok(active.update(db).await?)
}

/// Make one account the default, unflagging the previous one.
pub async fn set_default_account(
    db: &DatabaseConnection,
    user_id: i32,
    account_id: i32,
) -> AppResult<user_accounts::Model> {
    let account = get_account(db, user_id, account_id).await?;
    let txn = db.begin().await?;

    user_accounts::Entity::update_many()
        .col_expr(user_accounts::Column::IsDefault, Expr::value(false))
        .filter(user_accounts::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    let mut active: user_accounts::ActiveModel = account.into();
    active.is_default = ActiveValue::Set(true);
    active.updated_at = ActiveValue::Set(Utc::now());
    let account = active.update(&txn).await?;

    txn.commit().await?;
    Ok(account)
}

/// Delete an account and every trade recorded on it, trades first, in one
/// transaction. Returns how many trades went with it.
pub async fn delete_account(
    db: &DatabaseConnection,
    user_id: i32,
    account_id: i32,
) -> AppResult<u64> {
    let account = get_account(db, user_id, account_id).await?;
    if account.is_default {
        return Err(AppError::Validation(
            "The default account cannot be deleted".to_string(),
        ));
    }

    let txn = db.begin().await?;
    let trades = personal_trades::Entity::delete_many()
        .filter(personal_trades::Column::AccountId.eq(account.id))
        .exec(&txn)
        .await?;
    user_accounts::Entity::delete_by_id(account.id).exec(&txn).await?;
    txn.commit().await?;

    info!(
        "🗑️ Account '{}' deleted for user {} ({} trades)",
        account.account_name, user_id, trades.rows_affected
    );
    Ok(trades.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{memory_db, user};

    #[tokio::test]
    async fn test_default_account_survives_duplicate_insert() {
        let db = memory_db().await;
        let owner = user(&db, "trader@example.com").await;

        let first = ensure_default_account(&db, owner.id).await.unwrap();
        let err = insert_default_account(&db, owner.id).await.unwrap_err();
        assert!(is_unique_violation(&err));

        let again = ensure_default_account(&db, owner.id).await.unwrap();
        assert_eq!(again.id, first.id);
        let count = user_accounts::Entity::find()
            .filter(user_accounts::Column::UserId.eq(owner.id))
            .all(&db)
            .await
            .unwrap()
            .len();
        assert_eq!(count, 1);
    }
}
