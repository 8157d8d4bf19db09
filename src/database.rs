use sea_orm::{ConnectOptions, ConnectionTrait, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait as _;
use tracing::debug;

use crate::config::DatabaseConfig;

pub mod migrations;
pub mod models;

use migrations::Migrator;

/// Connect to the queue database and bring its schema up to date.
///
/// Every CLI invocation runs this before dispatching; the migrations are
/// idempotent, so concurrent invocations sharing one database file converge
/// on the same schema.
pub async fn setup_database(db_config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let db = setup_database_connection(db_config).await?;

    // WAL lets workers keep reading while the control surface writes. The
    // journal mode persists in the database file, so this is a no-op after
    // the first startup.
    db.execute_unprepared("PRAGMA journal_mode = WAL;").await?;

    Migrator::up(&db, None).await?;

    Ok(db)
}

pub async fn setup_database_connection(
    db_config: &DatabaseConfig,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(db_config.url.clone());

    options.sqlx_logging(false); // Disable SQL query logging to reduce noise
    options.max_connections(db_config.pool_size);

    debug!("Connecting to database at: {}", &db_config.url);

    sea_orm::Database::connect(options).await
}
