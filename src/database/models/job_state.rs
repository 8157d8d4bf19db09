use sea_orm::DeriveActiveEnum;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Lifecycle state of a queued command.
///
/// Jobs are created `pending`, claimed into `processing` by exactly one
/// worker, and settle as `completed`, back to `pending` (retry with an
/// incremented attempt count) or `dead` once the retry cap is exhausted.
///
/// # State transitions
///
/// - `Pending` → `Processing` (claim)
/// - `Processing` → `Completed` (success, terminal)
/// - `Processing` → `Pending` (failure with retries left)
/// - `Processing` → `Dead` (failure with retries exhausted)
/// - `Dead` → `Pending` (explicit DLQ retry, attempts reset to 0)
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
#[derive(Default)]
pub enum JobState {
    /// Waiting to be claimed. Newly enqueued jobs and jobs awaiting a retry
    /// both sit here; a pending job has no owner.
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,

    /// Claimed by a worker and executing (or sleeping out its backoff after a
    /// failed attempt). At most one worker ever observes a given job in this
    /// state.
    #[sea_orm(string_value = "processing")]
    Processing,

    /// Terminal: the command exited with status 0.
    #[sea_orm(string_value = "completed")]
    Completed,

    /// Reserved. Accepted as a filter and as a stored value for listing, but
    /// the worker loop never writes it: transient failures return to
    /// `Pending`, terminal ones go to `Dead`.
    #[sea_orm(string_value = "failed")]
    Failed,

    /// The dead-letter queue: the retry cap was exhausted. Only an explicit
    /// DLQ retry moves a job out of this state.
    #[sea_orm(string_value = "dead")]
    Dead,
}

impl JobState {
    /// The five states, in the order the status surface reports them.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
        Self::Dead,
    ];
}
