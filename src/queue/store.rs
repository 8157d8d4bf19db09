use std::{collections::HashMap, future::Future, time::Duration};

use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use sea_orm::ActiveValue::Set;
use tokio::time::sleep;

use crate::database::models::{
    config_entry::{self, Entity as ConfigEntity},
    event::{self, Entity as EventEntity},
    job::{self, Entity as JobEntity},
    job_state::JobState,
};
use crate::queue::EventKind;

const BUSY_RETRY_LIMIT: u32 = 5;

/// Retry an operation through transient SQLite contention.
///
/// SQLite surfaces write contention as `database is locked`; under a handful
/// of workers the lock clears within milliseconds, so a bounded backoff with
/// jitter absorbs it. Anything still failing after the limit is a real
/// storage error and surfaces to the caller.
pub async fn with_busy_retry<T, F, Fut>(mut op: F) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(err) if is_busy(&err) && attempt < BUSY_RETRY_LIMIT => {
                let backoff_ms = (1u64 << attempt) + fastrand::u64(..5);
                sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

pub fn is_busy(err: &DbErr) -> bool {
    let msg = err.to_string().to_ascii_lowercase();
    msg.contains("database is locked") || msg.contains("database is busy")
}

/// Insert a new `pending` job and return the stored row.
pub async fn insert_job(
    db: &impl ConnectionTrait,
    command: &str,
    max_retries: i32,
    external_id: Option<&str>,
) -> Result<job::Model, DbErr> {
    let now = Utc::now().naive_utc();

    let row = job::ActiveModel {
        command: Set(command.to_string()),
        state: Set(JobState::Pending),
        attempts: Set(0),
        max_retries: Set(max_retries),
        created_at: Set(now),
        updated_at: Set(now),
        external_id: Set(external_id.map(str::to_string)),
        ..Default::default()
    };

    row.insert(db).await
}

pub async fn get_job(db: &impl ConnectionTrait, id: i64) -> Result<Option<job::Model>, DbErr> {
    JobEntity::find_by_id(id).one(db).await
}

pub async fn get_job_by_external_id(
    db: &impl ConnectionTrait,
    external_id: &str,
) -> Result<Option<job::Model>, DbErr> {
    JobEntity::find()
        .filter(job::Column::ExternalId.eq(external_id))
        .one(db)
        .await
}

/// Jobs in creation order, oldest first, optionally filtered by state.
pub async fn list_jobs(
    db: &impl ConnectionTrait,
    state: Option<JobState>,
) -> Result<Vec<job::Model>, DbErr> {
    let mut query = JobEntity::find()
        .order_by_asc(job::Column::CreatedAt)
        .order_by_asc(job::Column::Id);

    if let Some(state) = state {
        query = query.filter(job::Column::State.eq(state));
    }

    query.all(db).await
}

/// The dead-letter queue, most recently updated first.
pub async fn list_dead_jobs(db: &impl ConnectionTrait) -> Result<Vec<job::Model>, DbErr> {
    JobEntity::find()
        .filter(job::Column::State.eq(JobState::Dead))
        .order_by_desc(job::Column::UpdatedAt)
        .order_by_desc(job::Column::Id)
        .all(db)
        .await
}

/// Per-state job counts in reporting order, zero-filled for absent states.
pub async fn counts_by_state(db: &impl ConnectionTrait) -> Result<Vec<(JobState, i64)>, DbErr> {
    let rows: Vec<(String, i64)> = JobEntity::find()
        .select_only()
        .column(job::Column::State)
        .column_as(job::Column::Id.count(), "count")
        .group_by(job::Column::State)
        .into_tuple()
        .all(db)
        .await?;

    let mut by_state: HashMap<String, i64> = rows.into_iter().collect();

    Ok(JobState::ALL
        .iter()
        .map(|state| (*state, by_state.remove(&state.to_string()).unwrap_or(0)))
        .collect())
}

pub async fn mark_completed(db: &impl ConnectionTrait, id: i64) -> Result<(), DbErr> {
    JobEntity::update_many()
        .col_expr(job::Column::State, Expr::value(JobState::Completed))
        .col_expr(job::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
        .filter(job::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Terminal DLQ promotion. The failure count is recorded on the row, so a
/// dead job always shows how many attempts it burned.
pub async fn mark_dead(db: &impl ConnectionTrait, id: i64, attempts: i32) -> Result<(), DbErr> {
    JobEntity::update_many()
        .col_expr(job::Column::State, Expr::value(JobState::Dead))
        .col_expr(job::Column::Attempts, Expr::value(attempts))
        .col_expr(job::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
        .filter(job::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Return a failed job to the queue with its incremented attempt count.
pub async fn requeue_with_attempts(
    db: &impl ConnectionTrait,
    id: i64,
    next_attempts: i32,
) -> Result<(), DbErr> {
    JobEntity::update_many()
        .col_expr(job::Column::State, Expr::value(JobState::Pending))
        .col_expr(job::Column::Attempts, Expr::value(next_attempts))
        .col_expr(job::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
        .filter(job::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Conditional `dead → pending` transition; resets the attempt counter.
///
/// The `state = 'dead'` predicate makes the operation safe to race: only one
/// caller observes `true` for a given promotion.
pub async fn retry_dead(db: &impl ConnectionTrait, id: i64) -> Result<bool, DbErr> {
    let update = JobEntity::update_many()
        .col_expr(job::Column::State, Expr::value(JobState::Pending))
        .col_expr(job::Column::Attempts, Expr::value(0))
        .col_expr(job::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
        .filter(job::Column::Id.eq(id))
        .filter(job::Column::State.eq(JobState::Dead))
        .exec(db)
        .await?;

    Ok(update.rows_affected == 1)
}

/// DLQ retry addressed by numeric id when the identifier parses as one,
/// otherwise by external id. Returns the retried job's id on success.
pub async fn retry_dead_by_identifier(
    db: &impl ConnectionTrait,
    identifier: &str,
) -> Result<Option<i64>, DbErr> {
    if let Ok(id) = identifier.parse::<i64>() {
        return Ok(retry_dead(db, id).await?.then_some(id));
    }

    match get_job_by_external_id(db, identifier).await? {
        Some(job) => Ok(retry_dead(db, job.id).await?.then_some(job.id)),
        None => Ok(None),
    }
}

pub async fn set_config(db: &impl ConnectionTrait, key: &str, value: &str) -> Result<(), DbErr> {
    let row = config_entry::ActiveModel {
        key: Set(key.to_string()),
        value: Set(value.to_string()),
    };

    ConfigEntity::insert(row)
        .on_conflict(
            OnConflict::column(config_entry::Column::Key)
                .update_column(config_entry::Column::Value)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

pub async fn get_config(db: &impl ConnectionTrait, key: &str) -> Result<Option<String>, DbErr> {
    Ok(ConfigEntity::find_by_id(key.to_string())
        .one(db)
        .await?
        .map(|row| row.value))
}

/// Append to the audit log. Callers treat failures as advisory.
pub async fn append_event(
    db: &impl ConnectionTrait,
    job_id: Option<i64>,
    kind: EventKind,
    detail: Option<String>,
) -> Result<(), DbErr> {
    let row = event::ActiveModel {
        job_id: Set(job_id),
        event: Set(kind.to_string()),
        detail: Set(detail),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    row.insert(db).await?;
    Ok(())
}

pub async fn list_events(
    db: &impl ConnectionTrait,
    job_id: Option<i64>,
) -> Result<Vec<event::Model>, DbErr> {
    let mut query = EventEntity::find()
        .order_by_asc(event::Column::CreatedAt)
        .order_by_asc(event::Column::Id);

    if let Some(job_id) = job_id {
        query = query.filter(event::Column::JobId.eq(job_id));
    }

    query.all(db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::setup_test::setup_test_queue;

    #[tokio::test]
    async fn lists_jobs_in_creation_order_with_state_filter() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        let first = insert_job(db, "echo one", 3, None).await.unwrap();
        let second = insert_job(db, "echo two", 3, None).await.unwrap();
        mark_completed(db, second.id).await.unwrap();

        let all = list_jobs(db, None).await.unwrap();
        assert_eq!(
            all.iter().map(|job| job.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );

        let pending = list_jobs(db, Some(JobState::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, first.id);
    }

    #[tokio::test]
    async fn counts_cover_all_states_with_zeros() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        insert_job(db, "echo hi", 3, None).await.unwrap();

        let counts = counts_by_state(db).await.unwrap();
        assert_eq!(counts.len(), 5);
        assert_eq!(counts[0], (JobState::Pending, 1));
        for (state, count) in &counts[1..] {
            assert_eq!(*count, 0, "expected zero {state} jobs");
        }
    }

    #[tokio::test]
    async fn retry_dead_only_touches_dead_rows_and_resets_attempts() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        let job = insert_job(db, "exit 1", 2, None).await.unwrap();

        // Not dead yet: the conditional update must not fire.
        assert!(!retry_dead(db, job.id).await.unwrap());

        mark_dead(db, job.id, 2).await.unwrap();
        let dead = get_job(db, job.id).await.unwrap().unwrap();
        assert_eq!(dead.attempts, 2);

        assert!(retry_dead(db, job.id).await.unwrap());

        let row = get_job(db, job.id).await.unwrap().unwrap();
        assert_eq!(row.state, JobState::Pending);
        assert_eq!(row.attempts, 0);

        // Second retry loses the `state = 'dead'` predicate.
        assert!(!retry_dead(db, job.id).await.unwrap());
    }

    #[tokio::test]
    async fn retry_dead_by_identifier_accepts_external_ids() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        let job = insert_job(db, "exit 1", 1, Some("batch-7")).await.unwrap();
        mark_dead(db, job.id, 1).await.unwrap();

        assert_eq!(
            retry_dead_by_identifier(db, "batch-7").await.unwrap(),
            Some(job.id)
        );
        assert_eq!(retry_dead_by_identifier(db, "batch-7").await.unwrap(), None);
        assert_eq!(retry_dead_by_identifier(db, "9999").await.unwrap(), None);
    }

    #[tokio::test]
    async fn config_upserts_and_reads_back() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        assert_eq!(get_config(db, "max_retries").await.unwrap(), None);

        set_config(db, "max_retries", "3").await.unwrap();
        set_config(db, "max_retries", "5").await.unwrap();

        assert_eq!(
            get_config(db, "max_retries").await.unwrap(),
            Some("5".to_string())
        );
    }

    #[tokio::test]
    async fn events_filter_by_job() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        let job = insert_job(db, "echo hi", 3, None).await.unwrap();
        append_event(db, Some(job.id), EventKind::Enqueued, None)
            .await
            .unwrap();
        append_event(db, None, EventKind::Processing, Some("worker=w1".into()))
            .await
            .unwrap();

        let for_job = list_events(db, Some(job.id)).await.unwrap();
        assert_eq!(for_job.len(), 1);
        assert_eq!(for_job[0].event, "enqueued");

        let all = list_events(db, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
