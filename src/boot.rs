use std::{env, process, str::FromStr as _};

use clap::Parser as _;
use config_rs::Config as ConfigRs;
use tracing::{debug, trace};

use crate::{
    app::App,
    cli::{Cli, Commands, ConfigAction, DlqAction, WorkerAction},
    commands::{config as config_cmd, dlq, enqueue, history, list, status, worker},
    config::Config,
    database::setup_database,
    environment::Environment,
    setup_tracing::setup_tracing_for_command,
};

const ENVIRONMENT_VARIABLE: &str = "QUEUECTL_ENVIRONMENT";

pub async fn boot() {
    let cli = Cli::parse();

    let environment = set_environment();
    let app_config = read_config(&environment);

    setup_tracing_for_command(&cli.command, &app_config.tracing.log_level);

    debug!("Environment set to: {:?}", environment);
    trace!("Configuration loaded: {:?}", app_config);

    let db = match setup_database(&app_config.database).await {
        Ok(db) => db,
        Err(err) => {
            eprintln!("failed to open queue database: {err}");
            process::exit(1);
        }
    };

    let app = App {
        config: app_config,
        environment,
        db,
    };

    handle_command(app, cli).await;
}

#[must_use]
pub fn set_environment() -> Environment {
    env::var(ENVIRONMENT_VARIABLE)
        .ok()
        .and_then(|s| Environment::from_str(&s).ok())
        .unwrap_or_default()
}

/// Built-in defaults, overlaid by an optional per-environment config file
/// and `QUEUECTL_*` environment variables. Unlike a server deployment, a
/// bare invocation with no config file at all must work.
pub fn read_config(environment: &Environment) -> Config {
    let config_file_name = environment.config_file();

    trace!("Reading configuration from: {}", config_file_name);

    ConfigRs::builder()
        .add_source(config_rs::File::with_name(&config_file_name).required(false))
        .add_source(config_rs::Environment::with_prefix("QUEUECTL").separator("__"))
        .build()
        .unwrap()
        .try_deserialize()
        .expect("Failed to deserialize configuration")
}

pub async fn handle_command(app: App, cli: Cli) {
    match cli.command {
        Commands::Enqueue { payload, retries } => {
            enqueue::handle_enqueue_command(&app, &payload, retries).await;
        }
        Commands::List { state } => {
            list::handle_list_command(&app, state).await;
        }
        Commands::Status => {
            status::handle_status_command(&app).await;
        }
        Commands::Dlq { action } => match action {
            DlqAction::List => dlq::handle_dlq_list_command(&app).await,
            DlqAction::Retry { identifier } => {
                dlq::handle_dlq_retry_command(&app, &identifier).await;
            }
        },
        Commands::Worker { action } => match action {
            WorkerAction::Start { count, backoff } => {
                worker::handle_worker_start_command(&app, count, backoff).await;
            }
            WorkerAction::Stop => worker::handle_worker_stop_command(&app).await,
        },
        Commands::Config { action } => match action {
            ConfigAction::Set { key, value } => {
                config_cmd::handle_config_set_command(&app, &key, &value).await;
            }
            ConfigAction::Get { key } => {
                config_cmd::handle_config_get_command(&app, &key).await;
            }
        },
        Commands::History { job_id } => {
            history::handle_history_command(&app, job_id).await;
        }
    }
}
