use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
};
use sea_orm::ActiveValue::Set;

use crate::database::models::{
    worker::{self, Entity as WorkerEntity},
    worker_status::WorkerStatus,
};

/// Worker ids are `<pid>-<random suffix>`: unique per instance, and the pid
/// prefix makes stale registry rows easy to attribute.
pub fn next_worker_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", std::process::id(), &suffix[..6])
}

/// Upsert a worker's registration, refreshing its heartbeat and marking it
/// running. Re-registering after a crash reuses the row.
pub async fn register_worker(
    db: &impl ConnectionTrait,
    worker_id: &str,
    pid: i64,
) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();

    let row = worker::ActiveModel {
        worker_id: Set(worker_id.to_string()),
        pid: Set(pid),
        started_at: Set(now),
        last_heartbeat: Set(Some(now)),
        status: Set(WorkerStatus::Running),
    };

    WorkerEntity::insert(row)
        .on_conflict(
            OnConflict::column(worker::Column::WorkerId)
                .update_columns([
                    worker::Column::Pid,
                    worker::Column::LastHeartbeat,
                    worker::Column::Status,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

pub async fn heartbeat(
    db: &impl ConnectionTrait,
    worker_id: &str,
    status: WorkerStatus,
) -> Result<(), DbErr> {
    WorkerEntity::update_many()
        .col_expr(
            worker::Column::LastHeartbeat,
            Expr::value(Utc::now().naive_utc()),
        )
        .col_expr(worker::Column::Status, Expr::value(status))
        .filter(worker::Column::WorkerId.eq(worker_id))
        .exec(db)
        .await?;

    Ok(())
}

/// Workers that are both marked running and have heartbeated within the
/// threshold. A crashed worker stays `running` in the registry but drops out
/// of this count once its heartbeat goes stale.
pub async fn count_active_workers(
    db: &impl ConnectionTrait,
    threshold_secs: i64,
) -> Result<u64, DbErr> {
    let cutoff = Utc::now().naive_utc() - chrono::Duration::seconds(threshold_secs);

    WorkerEntity::find()
        .filter(worker::Column::Status.eq(WorkerStatus::Running))
        .filter(worker::Column::LastHeartbeat.gte(cutoff))
        .count(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::setup_test::setup_test_queue;

    #[tokio::test]
    async fn registered_workers_count_as_active() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        register_worker(db, "100-abc123", 100).await.unwrap();
        register_worker(db, "100-def456", 100).await.unwrap();

        assert_eq!(count_active_workers(db, 10).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn stopped_workers_leave_the_active_count() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        register_worker(db, "100-abc123", 100).await.unwrap();
        heartbeat(db, "100-abc123", WorkerStatus::Stopped)
            .await
            .unwrap();

        assert_eq!(count_active_workers(db, 10).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stale_heartbeats_age_out() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        register_worker(db, "100-abc123", 100).await.unwrap();

        // Backdate the heartbeat past the threshold, as if the worker died
        // without writing a stopped status.
        let stale = Utc::now().naive_utc() - chrono::Duration::seconds(60);
        WorkerEntity::update_many()
            .col_expr(worker::Column::LastHeartbeat, Expr::value(stale))
            .filter(worker::Column::WorkerId.eq("100-abc123"))
            .exec(db)
            .await
            .unwrap();

        assert_eq!(count_active_workers(db, 10).await.unwrap(), 0);
        assert_eq!(count_active_workers(db, 120).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reregistration_reuses_the_row() {
        let queue = setup_test_queue().await;
        let db = &queue.app.db;

        register_worker(db, "100-abc123", 100).await.unwrap();
        heartbeat(db, "100-abc123", WorkerStatus::Stopped)
            .await
            .unwrap();
        register_worker(db, "100-abc123", 2200).await.unwrap();

        assert_eq!(count_active_workers(db, 10).await.unwrap(), 1);
    }

    #[test]
    fn worker_ids_carry_the_pid_and_differ() {
        let a = next_worker_id();
        let b = next_worker_id();

        assert!(a.starts_with(&format!("{}-", std::process::id())));
        assert_ne!(a, b);
    }
}
