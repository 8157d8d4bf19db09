//! `SeaORM` Entity for queued jobs

use crate::database::models::job_state::JobState;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Opaque shell string; never interpreted beyond quote normalization.
    pub command: String,
    pub state: JobState,
    /// Completed execution attempts. Stays at 0 until the first failure.
    pub attempts: i32,
    pub max_retries: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    /// Caller-supplied handle for addressing the job from outside.
    /// Uniqueness is not enforced.
    pub external_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
