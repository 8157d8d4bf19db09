use sea_orm::DeriveActiveEnum;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Registry status of a worker instance.
///
/// `Running` is written on registration and with every heartbeat; `Stopped`
/// is written when a worker exits cooperatively. A worker that crashes stays
/// `Running` but ages out of the active count once its heartbeat is stale.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "stopped")]
    Stopped,
}
