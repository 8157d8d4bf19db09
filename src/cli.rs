use std::str::FromStr as _;

use clap::{Parser, Subcommand};

use crate::database::models::job_state::JobState;

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enqueue a command (raw shell string or JSON object payload)
    Enqueue {
        /// Payload: either a JSON object with `command`, `max_retries`, `id`
        /// keys, or a raw shell string
        #[arg(required = true, num_args = 1..)]
        payload: Vec<String>,
        /// Retry cap used when neither the payload nor stored config provides
        /// one; falls back to the configured default when omitted
        #[arg(long)]
        retries: Option<i32>,
    },
    /// List jobs, optionally filtered by state
    List {
        #[arg(long, value_parser = parse_job_state)]
        state: Option<JobState>,
    },
    /// Show per-state job counts and the active worker count
    Status,
    /// Dead-letter queue operations
    Dlq {
        #[command(subcommand)]
        action: DlqAction,
    },
    /// Start or stop background workers
    Worker {
        #[command(subcommand)]
        action: WorkerAction,
    },
    /// Get or set stored configuration values
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Print job records as one JSON object per line
    History {
        #[arg(long)]
        job_id: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum DlqAction {
    /// List dead jobs, newest first
    List,
    /// Move a dead job back to pending by numeric id or external id
    Retry { identifier: String },
}

#[derive(Subcommand)]
pub enum WorkerAction {
    /// Clear the stop flag and run workers until interrupted
    Start {
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Base for exponential retry backoff
        #[arg(long)]
        backoff: Option<u64>,
    },
    /// Signal all workers to stop once idle
    Stop,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Upsert a configuration value
    Set { key: String, value: String },
    /// Print a configuration value
    Get { key: String },
}

fn parse_job_state(raw: &str) -> Result<JobState, String> {
    JobState::from_str(raw)
        .map_err(|_| format!("invalid state '{raw}' (expected pending, processing, completed, failed or dead)"))
}
