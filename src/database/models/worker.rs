//! `SeaORM` Entity for the worker registry

use crate::database::models::worker_status::WorkerStatus;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "workers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub worker_id: String,
    pub pid: i64,
    pub started_at: DateTime,
    /// Nullable for rows written by older releases that registered workers
    /// before the first heartbeat.
    pub last_heartbeat: Option<DateTime>,
    pub status: WorkerStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
