//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "personal_trades")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub account_id: i32,
    pub trade_date: Date,
    pub entry_time: Option<String>, // "HH:MM"
    pub symbol: String,
    pub side: String, // "BUY" or "SELL"
    pub entry: String,
    pub exit: String,
    pub stop_loss: Option<String>,
    pub pnl: String, // decimal text
    pub status: String, // "WIN", "LOSS", "BE"
    #[sea_orm(column_type = "Text", nullable)]
    pub loss_reasons: Option<String>, // JSON array of reason ids, e.g. ["contre_sma"]
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub image1: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub image2: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::user_accounts::Entity",
        from = "Column::AccountId",
        to = "super::user_accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    UserAccounts,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::user_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn loss_reason_list(&self) -> Vec<String> {
        self.loss_reasons
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
            .unwrap_or_default()
    }
}
