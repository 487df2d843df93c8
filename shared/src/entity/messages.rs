//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub channel_id: String,
    pub user_id: Option<i32>,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub author: String,
    pub author_type: String, // "admin" or "user"
    #[sea_orm(column_type = "Text", nullable)]
    pub author_avatar: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub attachment_data: Option<String>, // base64 data URI
    pub attachment_type: Option<String>,
    pub attachment_name: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
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
