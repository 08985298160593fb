//! SeaORM Entity for users table

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing)]
    pub email: Option<String>,
    /// "user" or "admin"; see `crate::actor::Role`.
    pub role: String,
    pub is_reported: bool,
    pub is_suspended: bool,
    pub suspended_reason: Option<String>,
    pub suspended_by: Option<i32>,
    pub suspended_at: Option<DateTime>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::SuspendedBy",
        to = "Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    SuspendedBy,
}

impl ActiveModelBehavior for ActiveModel {}
