//! SeaORM Entity for funds table
//!
//! Ledger of realized contributions. Rows are inserted once per verified
//! funding request and never updated or deleted.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "funds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    pub funder_id: i32,
    #[sea_orm(unique)]
    pub funding_request_id: i32,
    pub amount_cents: i64,
    pub funded_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Project,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::FunderId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Funder,
    #[sea_orm(
        belongs_to = "super::funding_requests::Entity",
        from = "Column::FundingRequestId",
        to = "super::funding_requests::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    FundingRequest,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
