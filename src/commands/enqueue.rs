use std::process;

use serde_json::Value;
use tracing::warn;

use crate::app::App;
use crate::queue::{config_keys, store, EnqueueError, EventKind};

/// Payload forms accepted by `enqueue`, normalized at the CLI boundary so
/// the core only ever sees `(command, max_retries, external_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueuePayload {
    /// A JSON object carrying `command` plus optional `max_retries` and `id`.
    Structured {
        command: Option<String>,
        max_retries: Option<i32>,
        external_id: Option<String>,
    },
    /// Anything else: an opaque shell string.
    Raw(String),
}

impl EnqueuePayload {
    /// Only JSON objects take the structured path. Non-object JSON (`123`,
    /// `[..]`, `"quoted"`) is a perfectly good shell string as far as the
    /// queue is concerned.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => Self::Structured {
                command: fields
                    .get("command")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                max_retries: fields.get("max_retries").and_then(parse_retries),
                external_id: fields.get("id").and_then(Value::as_str).map(str::to_string),
            },
            _ => Self::Raw(raw.to_string()),
        }
    }
}

fn parse_retries(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

pub async fn handle_enqueue_command(app: &App, payload_words: &[String], retries_flag: Option<i32>) {
    let raw = payload_words.join(" ");

    match enqueue_job(app, &EnqueuePayload::parse(&raw), retries_flag).await {
        Ok(job_id) => println!("enqueued {job_id}"),
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

/// Insert a `pending` job and append the `enqueued` audit event.
///
/// The retry cap resolves payload-first, then the store-backed
/// `max_retries` key, then the `--retries` flag, then the configured
/// `workers.default_max_retries`.
pub async fn enqueue_job(
    app: &App,
    payload: &EnqueuePayload,
    retries_flag: Option<i32>,
) -> Result<i64, EnqueueError> {
    let (command, payload_retries, external_id) = match payload {
        EnqueuePayload::Structured {
            command,
            max_retries,
            external_id,
        } => (
            command.clone().unwrap_or_default(),
            *max_retries,
            external_id.clone(),
        ),
        EnqueuePayload::Raw(raw) => (raw.clone(), None, None),
    };

    if command.trim().is_empty() {
        return Err(EnqueueError::EmptyCommand);
    }

    let max_retries = match payload_retries {
        Some(retries) => retries,
        None => default_retries(app, retries_flag).await?,
    };

    let job = store::with_busy_retry(|| {
        store::insert_job(&app.db, &command, max_retries, external_id.as_deref())
    })
    .await?;

    let detail = format!("cmd={command}, max_retries={max_retries}");
    if let Err(err) = store::with_busy_retry(|| {
        store::append_event(&app.db, Some(job.id), EventKind::Enqueued, Some(detail.clone()))
    })
    .await
    {
        warn!("failed to record enqueue event for job {}: {err}", job.id);
    }

    Ok(job.id)
}

async fn default_retries(app: &App, retries_flag: Option<i32>) -> Result<i32, sea_orm::DbErr> {
    let stored = store::with_busy_retry(|| store::get_config(&app.db, config_keys::MAX_RETRIES))
        .await?
        .and_then(|value| value.parse().ok());

    Ok(stored
        .or(retries_flag)
        .unwrap_or(app.config.workers.default_max_retries))
}
