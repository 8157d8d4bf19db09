//! `SeaORM` Entity for the append-only job audit log

use sea_orm::entity::prelude::*;

/// Events are advisory: losing one never compromises queue correctness, so
/// writers swallow append failures.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub job_id: Option<i64>,
    pub event: String,
    pub detail: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
