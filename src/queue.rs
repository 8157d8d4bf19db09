pub mod dispatcher;
pub mod executor;
pub mod registry;
pub mod store;
pub mod worker;

use sea_orm::DbErr;
use strum::Display;
use thiserror::Error;

/// Store-backed configuration keys the core consumes.
pub mod config_keys {
    /// Default retry cap for payloads that do not specify one.
    pub const MAX_RETRIES: &str = "max_retries";

    /// Base for exponential retry backoff.
    pub const BACKOFF: &str = "backoff";

    /// Cooperative stop signal: `"1"` asks workers to exit once idle.
    pub const WORKERS_SHOULD_STOP: &str = "workers_should_stop";
}

/// Labels written to the append-only audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Enqueued,
    Processing,
    Completed,
    Dead,
    RetryScheduled,
    DlqRetry,
}

#[derive(Debug, Error)]
pub enum EnqueueError {
    #[error("command must not be empty")]
    EmptyCommand,
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// The fields a worker needs to run a job it has claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedJob {
    pub id: i64,
    pub command: String,
    pub attempts: i32,
    pub max_retries: i32,
}
