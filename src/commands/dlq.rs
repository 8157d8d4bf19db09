use std::process;

use tracing::warn;

use crate::app::App;
use crate::queue::{store, EventKind};

pub async fn handle_dlq_list_command(app: &App) {
    let jobs = match store::with_busy_retry(|| store::list_dead_jobs(&app.db)).await {
        Ok(jobs) => jobs,
        Err(err) => {
            eprintln!("failed to list the DLQ: {err}");
            process::exit(1);
        }
    };

    if jobs.is_empty() {
        println!("DLQ is empty");
        return;
    }

    for job in &jobs {
        let external = job.external_id.as_deref().unwrap_or("-");
        println!("{} ({external})\tdead\tcmd={}", job.id, job.command);
    }
}

pub async fn handle_dlq_retry_command(app: &App, identifier: &str) {
    match store::with_busy_retry(|| store::retry_dead_by_identifier(&app.db, identifier)).await {
        Ok(Some(job_id)) => {
            println!("retried {identifier}");
            if let Err(err) = store::with_busy_retry(|| {
                store::append_event(&app.db, Some(job_id), EventKind::DlqRetry, None)
            })
            .await
            {
                warn!("failed to record DLQ retry event for job {job_id}: {err}");
            }
        }
        Ok(None) => {
            eprintln!("job {identifier} not in DLQ");
            process::exit(1);
        }
        Err(err) => {
            eprintln!("failed to retry job {identifier}: {err}");
            process::exit(1);
        }
    }
}
