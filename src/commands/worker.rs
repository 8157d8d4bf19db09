use std::{process, time::Duration};

use crate::app::App;
use crate::queue::{
    config_keys, store,
    worker::{spawn_worker, WorkerOptions},
};

/// Clear the stop flag, spawn the requested workers, then block until
/// interrupted. Ctrl-C sets the stop flag for every worker sharing this
/// database (including those started by other invocations) and exits;
/// workers in other processes drain cooperatively.
pub async fn handle_worker_start_command(app: &App, count: u32, backoff: Option<u64>) {
    if let Err(err) =
        store::with_busy_retry(|| store::set_config(&app.db, config_keys::WORKERS_SHOULD_STOP, "0"))
            .await
    {
        eprintln!("failed to clear the stop flag: {err}");
        process::exit(1);
    }

    let options = WorkerOptions {
        poll_interval: Duration::from_secs(app.config.workers.poll_interval_secs),
        backoff_base: backoff.unwrap_or(app.config.workers.backoff_base),
    };

    let mut worker_ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        // Handles are dropped on purpose: the tasks detach, and this process
        // exits on interrupt just like the workers it hosts.
        let (_handle, worker_id) = spawn_worker(app, &options);
        worker_ids.push(worker_id);
    }

    println!(
        "started {} worker(s): {}",
        worker_ids.len(),
        worker_ids.join(", ")
    );

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            println!("stopping workers...");
            if let Err(err) = store::with_busy_retry(|| {
                store::set_config(&app.db, config_keys::WORKERS_SHOULD_STOP, "1")
            })
            .await
            {
                eprintln!("failed to set the stop flag: {err}");
                process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("failed to listen for interrupt: {err}");
            process::exit(1);
        }
    }
}

pub async fn handle_worker_stop_command(app: &App) {
    match store::with_busy_retry(|| store::set_config(&app.db, config_keys::WORKERS_SHOULD_STOP, "1"))
        .await
    {
        Ok(()) => println!("signaled workers to stop"),
        Err(err) => {
            eprintln!("failed to signal workers: {err}");
            process::exit(1);
        }
    }
}
