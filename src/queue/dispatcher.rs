use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};

use crate::database::models::{
    job::{self, Entity as JobEntity},
    job_state::JobState,
};
use crate::queue::{store, ClaimedJob};

/// Atomically claim the oldest pending job for the calling worker.
///
/// The predicate-guarded UPDATE (`WHERE id = ? AND state = 'pending'`) is the
/// sole defense against two workers claiming the same row; the surrounding
/// transaction only narrows the race window. A lost race reads as "no job",
/// and the caller's poll loop tries again.
pub async fn claim_next(db: &DatabaseConnection) -> Result<Option<ClaimedJob>, DbErr> {
    match store::with_busy_retry(|| claim_attempt(db)).await {
        // Contention that outlives the bounded retry is still just a lost
        // race from the caller's point of view.
        Err(err) if store::is_busy(&err) => Ok(None),
        other => other,
    }
}

async fn claim_attempt(db: &DatabaseConnection) -> Result<Option<ClaimedJob>, DbErr> {
    let txn = db.begin().await?;

    let candidate = JobEntity::find()
        .filter(job::Column::State.eq(JobState::Pending))
        .order_by_asc(job::Column::CreatedAt)
        .order_by_asc(job::Column::Id)
        .limit(1)
        .one(&txn)
        .await?;

    let Some(candidate) = candidate else {
        txn.commit().await?;
        return Ok(None);
    };

    let update = JobEntity::update_many()
        .col_expr(job::Column::State, Expr::value(JobState::Processing))
        .col_expr(job::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
        .filter(job::Column::Id.eq(candidate.id))
        .filter(job::Column::State.eq(JobState::Pending))
        .exec(&txn)
        .await?;

    if update.rows_affected != 1 {
        // Another worker won the row between the select and the update.
        txn.rollback().await?;
        return Ok(None);
    }

    txn.commit().await?;

    Ok(Some(ClaimedJob {
        id: candidate.id,
        command: candidate.command,
        attempts: candidate.attempts,
        max_retries: candidate.max_retries,
    }))
}
