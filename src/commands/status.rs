use std::process;

use crate::app::App;
use crate::queue::{registry, store};

pub async fn handle_status_command(app: &App) {
    let counts = match store::with_busy_retry(|| store::counts_by_state(&app.db)).await {
        Ok(counts) => counts,
        Err(err) => {
            eprintln!("failed to count jobs: {err}");
            process::exit(1);
        }
    };

    println!("Jobs:");
    for (state, count) in counts {
        println!("  {state}: {count}");
    }

    let threshold = app.config.workers.liveness_threshold_secs;
    match store::with_busy_retry(|| registry::count_active_workers(&app.db, threshold)).await {
        Ok(active) => println!("Active workers: {active}"),
        Err(err) => {
            eprintln!("failed to count workers: {err}");
            process::exit(1);
        }
    }
}
