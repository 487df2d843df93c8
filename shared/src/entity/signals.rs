//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "signals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub channel_id: String,
    pub author_id: Option<i32>,
    pub signal_type: String, // "BUY" or "SELL"
    pub symbol: String,
    pub timeframe: String, // "1 min", "5m", "1h", etc.
    pub entry: String,
    pub take_profit: String,
    pub stop_loss: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub image: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub attachment_data: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_name: Option<String>,
    pub status: String, // "ACTIVE", "WIN", "LOSS", "BE"
    pub pnl: Option<String>, // decimal text, set on close
    #[sea_orm(column_type = "Text", nullable)]
    pub close_message: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub closure_image: Option<String>,
    pub loss_reason: Option<String>,
    pub created_at: DateTimeUtc,
    pub closed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuthorId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
