use std::time::Duration;

use sea_orm::DatabaseConnection;
use tokio::{task::JoinHandle, time::sleep};
use tracing::{error, info, warn};

use crate::app::App;
use crate::database::models::worker_status::WorkerStatus;
use crate::queue::{config_keys, dispatcher, executor, registry, store, ClaimedJob, EventKind};

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Sleep between claim attempts while the queue is empty.
    pub poll_interval: Duration,
    /// Backoff base used when the store-backed `backoff` key is unset.
    pub backoff_base: u64,
}

/// Spawn a worker loop as a background task and return its registry id.
pub fn spawn_worker(app: &App, options: &WorkerOptions) -> (JoinHandle<()>, String) {
    let worker_id = registry::next_worker_id();
    let handle = tokio::spawn(worker_loop(
        app.clone(),
        options.clone(),
        worker_id.clone(),
    ));
    (handle, worker_id)
}

/// The long-running claim/execute/settle loop.
///
/// The loop is cooperative: the stop flag is read between jobs, never
/// mid-execution, so a worker finishes its current attempt (including any
/// backoff sleep) before exiting. It also never terminates over a single
/// job's failure; execution failures feed the state machine and storage
/// hiccups are logged and retried on the next pass.
pub async fn worker_loop(app: App, options: WorkerOptions, worker_id: String) {
    let db = &app.db;

    if let Err(err) = registry::register_worker(db, &worker_id, i64::from(std::process::id())).await
    {
        error!("worker '{}' failed to register: {err}", worker_id);
        return;
    }

    info!("⚡ worker '{}' started", worker_id);

    loop {
        beat(db, &worker_id, WorkerStatus::Running).await;

        let stop_requested = read_stop_flag(db).await;

        let claimed = match dispatcher::claim_next(db).await {
            Ok(claimed) => claimed,
            Err(err) => {
                warn!("worker '{}' claim failed: {err}", worker_id);
                None
            }
        };

        let Some(job) = claimed else {
            if stop_requested {
                beat(db, &worker_id, WorkerStatus::Stopped).await;
                info!("worker '{}' stopped", worker_id);
                break;
            }
            sleep(options.poll_interval).await;
            continue;
        };

        process_job(db, &options, &worker_id, job).await;

        beat(db, &worker_id, WorkerStatus::Running).await;
    }
}

async fn process_job(
    db: &DatabaseConnection,
    options: &WorkerOptions,
    worker_id: &str,
    job: ClaimedJob,
) {
    info!(
        "🔧 worker '{}' processing job {} (attempt {}/{})",
        worker_id,
        job.id,
        job.attempts + 1,
        job.max_retries
    );
    record_event(
        db,
        job.id,
        EventKind::Processing,
        Some(format!("worker={worker_id}")),
    )
    .await;

    if executor::execute(&job.command).await {
        if let Err(err) = store::with_busy_retry(|| store::mark_completed(db, job.id)).await {
            error!(
                "worker '{}' failed to record completion of job {}: {err}",
                worker_id, job.id
            );
            return;
        }
        info!("✅ worker '{}' completed job {}", worker_id, job.id);
        record_event(db, job.id, EventKind::Completed, None).await;
        return;
    }

    let next_attempts = job.attempts + 1;

    if next_attempts >= job.max_retries {
        if let Err(err) =
            store::with_busy_retry(|| store::mark_dead(db, job.id, next_attempts)).await
        {
            error!(
                "worker '{}' failed to move job {} to the DLQ: {err}",
                worker_id, job.id
            );
            return;
        }
        warn!(
            "💀 worker '{}' moved job {} to the DLQ after {} attempt(s)",
            worker_id, job.id, next_attempts
        );
        record_event(db, job.id, EventKind::Dead, None).await;
        return;
    }

    let base = read_backoff_base(db, options.backoff_base).await;
    let exponent = u32::try_from(next_attempts).unwrap_or(u32::MAX);
    let delay_secs = base.saturating_pow(exponent);

    info!(
        "worker '{}' retrying job {} in {}s (attempt {}/{})",
        worker_id, job.id, delay_secs, next_attempts, job.max_retries
    );

    // The row stays `processing` through the backoff sleep, so no other
    // worker can re-claim the failing job early. The slot is blocked for the
    // duration; that trade is deliberate.
    sleep(Duration::from_secs(delay_secs)).await;

    if let Err(err) =
        store::with_busy_retry(|| store::requeue_with_attempts(db, job.id, next_attempts)).await
    {
        error!(
            "worker '{}' failed to requeue job {}: {err}",
            worker_id, job.id
        );
        return;
    }
    record_event(
        db,
        job.id,
        EventKind::RetryScheduled,
        Some(format!("attempts={next_attempts}, delay={delay_secs}")),
    )
    .await;
}

async fn read_stop_flag(db: &DatabaseConnection) -> bool {
    match store::get_config(db, config_keys::WORKERS_SHOULD_STOP).await {
        Ok(value) => value.as_deref() == Some("1"),
        Err(err) => {
            warn!("failed to read the stop flag: {err}");
            false
        }
    }
}

async fn read_backoff_base(db: &DatabaseConnection, fallback: u64) -> u64 {
    match store::get_config(db, config_keys::BACKOFF).await {
        Ok(Some(value)) => value.parse().unwrap_or(fallback),
        Ok(None) => fallback,
        Err(err) => {
            warn!("failed to read the backoff base: {err}");
            fallback
        }
    }
}

// Heartbeats and audit events are advisory; losing one must not poison the
// job being processed.
async fn beat(db: &DatabaseConnection, worker_id: &str, status: WorkerStatus) {
    if let Err(err) = registry::heartbeat(db, worker_id, status).await {
        warn!("worker '{}' heartbeat failed: {err}", worker_id);
    }
}

async fn record_event(db: &DatabaseConnection, job_id: i64, kind: EventKind, detail: Option<String>) {
    if let Err(err) = store::append_event(db, Some(job_id), kind, detail).await {
        warn!("failed to record {kind} event for job {job_id}: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::job_state::JobState;
    use crate::tests::setup_test::setup_test_queue;
    use tokio::time::timeout;

    fn test_options() -> WorkerOptions {
        WorkerOptions {
            poll_interval: Duration::from_millis(20),
            backoff_base: 0, // retry instantly; these tests are about state, not timing
        }
    }

    async fn wait_for_state(
        db: &DatabaseConnection,
        job_id: i64,
        state: JobState,
    ) -> crate::database::models::job::Model {
        let deadline = Duration::from_secs(5);
        timeout(deadline, async {
            loop {
                let job = store::get_job(db, job_id).await.unwrap().unwrap();
                if job.state == state {
                    break job;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("job {job_id} never reached {state}"))
    }

    async fn stop_worker(db: &DatabaseConnection, handle: JoinHandle<()>) {
        store::set_config(db, config_keys::WORKERS_SHOULD_STOP, "1")
            .await
            .unwrap();
        timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn successful_jobs_complete_with_a_single_processing_event() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        let job = store::insert_job(db, "true", 3, None).await.unwrap();

        let (handle, worker_id) = spawn_worker(&queue.app, &test_options());

        let row = wait_for_state(db, job.id, JobState::Completed).await;
        assert_eq!(row.attempts, 0);

        stop_worker(db, handle).await;

        let events = store::list_events(db, Some(job.id)).await.unwrap();
        let processing: Vec<_> = events.iter().filter(|e| e.event == "processing").collect();
        assert_eq!(processing.len(), 1);
        assert_eq!(
            processing[0].detail.as_deref(),
            Some(format!("worker={worker_id}").as_str())
        );
        assert!(events.iter().any(|e| e.event == "completed"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failing_jobs_retry_then_land_in_the_dlq() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        let job = store::insert_job(db, "exit 7", 2, None).await.unwrap();

        let (handle, _) = spawn_worker(&queue.app, &test_options());

        let row = wait_for_state(db, job.id, JobState::Dead).await;
        assert_eq!(row.attempts, row.max_retries);

        stop_worker(db, handle).await;

        let events = store::list_events(db, Some(job.id)).await.unwrap();
        let labels: Vec<_> = events.iter().map(|e| e.event.as_str()).collect();
        assert_eq!(
            labels.iter().filter(|label| **label == "processing").count(),
            2
        );
        assert_eq!(
            labels
                .iter()
                .filter(|label| **label == "retry_scheduled")
                .count(),
            1
        );
        assert_eq!(labels.last(), Some(&"dead"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn zero_retry_budget_goes_straight_to_the_dlq() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        let job = store::insert_job(db, "exit 1", 1, None).await.unwrap();

        let (handle, _) = spawn_worker(&queue.app, &test_options());

        let row = wait_for_state(db, job.id, JobState::Dead).await;
        assert_eq!(row.attempts, 1);

        stop_worker(db, handle).await;

        let events = store::list_events(db, Some(job.id)).await.unwrap();
        assert!(!events.iter().any(|e| e.event == "retry_scheduled"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn idle_workers_exit_on_the_stop_flag_and_mark_themselves_stopped() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        let (handle, _worker_id) = spawn_worker(&queue.app, &test_options());

        // Let the worker register and heartbeat before signaling.
        sleep(Duration::from_millis(50)).await;
        assert_eq!(registry::count_active_workers(db, 10).await.unwrap(), 1);

        stop_worker(db, handle).await;

        assert_eq!(registry::count_active_workers(db, 10).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn dlq_retry_reruns_the_job_from_a_clean_attempt_count() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        let job = store::insert_job(db, "exit 7", 1, None).await.unwrap();

        let (handle, _) = spawn_worker(&queue.app, &test_options());
        wait_for_state(db, job.id, JobState::Dead).await;

        assert!(store::retry_dead(db, job.id).await.unwrap());
        let row = wait_for_state(db, job.id, JobState::Dead).await;
        assert_eq!(row.attempts, row.max_retries);

        stop_worker(db, handle).await;

        // Two full lifecycles: two processing events, two dead events.
        let events = store::list_events(db, Some(job.id)).await.unwrap();
        assert_eq!(events.iter().filter(|e| e.event == "processing").count(), 2);
        assert_eq!(events.iter().filter(|e| e.event == "dead").count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn two_workers_share_a_backlog_without_double_execution() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        let mut job_ids = Vec::new();
        for i in 0..6 {
            let job = store::insert_job(db, &format!("echo {i}"), 3, None)
                .await
                .unwrap();
            job_ids.push(job.id);
        }

        let (first, _) = spawn_worker(&queue.app, &test_options());
        let (second, _) = spawn_worker(&queue.app, &test_options());

        for job_id in &job_ids {
            wait_for_state(db, *job_id, JobState::Completed).await;
        }

        store::set_config(db, config_keys::WORKERS_SHOULD_STOP, "1")
            .await
            .unwrap();
        timeout(Duration::from_secs(5), first).await.unwrap().unwrap();
        timeout(Duration::from_secs(5), second)
            .await
            .unwrap()
            .unwrap();

        // Exactly one worker recorded a processing event per job.
        for job_id in &job_ids {
            let events = store::list_events(db, Some(*job_id)).await.unwrap();
            assert_eq!(
                events.iter().filter(|e| e.event == "processing").count(),
                1,
                "job {job_id} was processed more than once"
            );
        }
    }
}
