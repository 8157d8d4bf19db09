use sea_orm::DatabaseConnection;

use crate::{config::Config, environment::Environment};

/// Process-wide handle threaded through the core: configuration plus the
/// shared database connection. All cross-worker coordination goes through
/// the store this wraps; there is deliberately no other shared state.
#[derive(Clone, Debug)]
pub struct App {
    pub config: Config,
    pub environment: Environment,
    pub db: DatabaseConnection,
}
