use std::process;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::app::App;
use crate::database::models::{job, job_state::JobState};
use crate::queue::store;

/// One line of `history` output. Field order is the emitted key order.
#[derive(Serialize)]
struct JobRecord<'a> {
    id: String,
    command: &'a str,
    state: JobState,
    attempts: i32,
    max_retries: i32,
    created_at: String,
    updated_at: String,
}

pub async fn handle_history_command(app: &App, job_id: Option<i64>) {
    let jobs = match fetch_jobs(app, job_id).await {
        Ok(jobs) => jobs,
        Err(err) => {
            eprintln!("failed to read history: {err}");
            process::exit(1);
        }
    };

    if jobs.is_empty() {
        println!("<none>");
        return;
    }

    for job in &jobs {
        println!("{}", render_job(job));
    }
}

async fn fetch_jobs(app: &App, job_id: Option<i64>) -> Result<Vec<job::Model>, sea_orm::DbErr> {
    match job_id {
        Some(id) => Ok(store::with_busy_retry(|| store::get_job(&app.db, id))
            .await?
            .into_iter()
            .collect()),
        None => store::with_busy_retry(|| store::list_jobs(&app.db, None)).await,
    }
}

fn render_job(job: &job::Model) -> String {
    let record = JobRecord {
        id: job.id.to_string(),
        command: &job.command,
        state: job.state,
        attempts: job.attempts,
        max_retries: job.max_retries,
        created_at: to_iso_z(&job.created_at),
        updated_at: to_iso_z(&job.updated_at),
    };

    serde_json::to_string(&record).expect("job record serializes")
}

/// ISO-8601 with an explicit UTC marker; the store keeps naive UTC
/// timestamps.
fn to_iso_z(timestamp: &NaiveDateTime) -> String {
    format!("{}Z", timestamp.format("%Y-%m-%dT%H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, Utc};

    fn sample_job() -> job::Model {
        job::Model {
            id: 7,
            command: "echo hi".to_string(),
            state: JobState::Completed,
            attempts: 1,
            max_retries: 3,
            created_at: NaiveDate::from_ymd_opt(2025, 11, 2)
                .unwrap()
                .and_hms_opt(9, 30, 15)
                .unwrap(),
            updated_at: NaiveDate::from_ymd_opt(2025, 11, 2)
                .unwrap()
                .and_hms_opt(9, 31, 0)
                .unwrap(),
            external_id: None,
        }
    }

    #[test]
    fn renders_the_documented_key_order_and_shapes() {
        let line = render_job(&sample_job());

        assert_eq!(
            line,
            r#"{"id":"7","command":"echo hi","state":"completed","attempts":1,"max_retries":3,"created_at":"2025-11-02T09:30:15Z","updated_at":"2025-11-02T09:31:00Z"}"#
        );
    }

    #[test]
    fn timestamps_round_trip_as_iso_8601_utc() {
        let rendered = to_iso_z(&sample_job().created_at);

        let parsed = DateTime::parse_from_rfc3339(&rendered).unwrap();
        assert_eq!(parsed.with_timezone(&Utc).naive_utc(), sample_job().created_at);
    }
}
