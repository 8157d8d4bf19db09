use time::format_description::parse;
use tracing_subscriber::fmt::time::OffsetTime;

use crate::cli::{Commands, WorkerAction};

pub fn setup_tracing_for_command(command: &Commands, worker_log_level: &str) {
    // Short-lived control commands stay quiet so their structured stdout is
    // the only output; a running worker pool gets operational visibility.
    // RUST_LOG overrides either default.
    let default_level = match command {
        Commands::Worker {
            action: WorkerAction::Start { .. },
        } => worker_log_level,
        _ => "warn",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
        // Filter out noisy third-party logs
        .add_directive("sqlx=warn".parse().unwrap())
        .add_directive("sea_orm_migration::migrator=warn".parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_ansi(true)
        .with_timer(OffsetTime::new(
            time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC),
            parse("[hour]:[minute]:[second].[subsecond digits:2]").unwrap(),
        ))
        .compact()
        .init();
}
