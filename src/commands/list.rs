use std::process;

use crate::app::App;
use crate::database::models::{job, job_state::JobState};
use crate::queue::store;

pub async fn handle_list_command(app: &App, state: Option<JobState>) {
    match store::with_busy_retry(|| store::list_jobs(&app.db, state)).await {
        Ok(jobs) => print_jobs(state, &jobs),
        Err(err) => {
            eprintln!("failed to list jobs: {err}");
            process::exit(1);
        }
    }
}

fn print_jobs(state: Option<JobState>, jobs: &[job::Model]) {
    match state {
        Some(state) => println!("Jobs ({state}):"),
        None => println!("Jobs (all):"),
    }

    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }

    for job in jobs {
        println!(
            "  {}\t{}\tattempts={}/{}\tcmd={}",
            job.id, job.state, job.attempts, job.max_retries, job.command
        );
    }
}
