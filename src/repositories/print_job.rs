use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use postgres_types::Json;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::print_job::{JobStatus, PrintJob, PrintSettings},
};

fn row_to_job(row: &Row) -> Result<PrintJob> {
    let settings: Json<PrintSettings> = row
        .try_get("print_settings")
        .map_err(|_| AppError::MissingData("print_settings".to_string()))?;

    Ok(PrintJob {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        user_id: row.try_get("user_id").map_err(|_| AppError::MissingData("user_id".to_string()))?,
        file_name: row.try_get("file_name").map_err(|_| AppError::MissingData("file_name".to_string()))?,
        storage_ref: row.try_get("storage_ref").map_err(|_| AppError::MissingData("storage_ref".to_string()))?,
        file_size: row.try_get("file_size").map_err(|_| AppError::MissingData("file_size".to_string()))?,
        checksum: row.try_get("checksum").map_err(|_| AppError::MissingData("checksum".to_string()))?,
        points_used: row.try_get("points_used").map_err(|_| AppError::MissingData("points_used".to_string()))?,
        print_settings: settings.0,
        status: row.try_get("status").map_err(|_| AppError::MissingData("status".to_string()))?,
        delete_after: row.try_get("delete_after").map_err(|_| AppError::MissingData("delete_after".to_string()))?,
        printed_by_booth: row.try_get("printed_by_booth").map_err(|_| AppError::MissingData("printed_by_booth".to_string()))?,
        printed_at: row.try_get("printed_at").map_err(|_| AppError::MissingData("printed_at".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
    })
}

/// Creates a pending job for a freshly stored upload.
pub async fn create(
    pool: &Pool,
    id: Uuid,
    user_id: Uuid,
    file_name: &str,
    storage_ref: &str,
    file_size: i64,
    checksum: Option<&str>,
    points_used: i32,
    settings: &PrintSettings,
    delete_after: DateTime<Utc>,
) -> Result<PrintJob> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO print_jobs
                (id, user_id, file_name, storage_ref, file_size, checksum,
                 points_used, print_settings, status, delete_after)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9)
            RETURNING *
            "#,
            &[
                &id,
                &user_id,
                &file_name,
                &storage_ref,
                &file_size,
                &checksum,
                &points_used,
                &Json(settings),
                &delete_after,
            ],
        )
        .await?;
    row_to_job(&row)
}

/// Finds a job by its ID.
pub async fn find_by_id(pool: &Pool, job_id: &Uuid) -> Result<Option<PrintJob>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM print_jobs
            WHERE id = $1
            "#,
            &[job_id],
        )
        .await?;
    row.map(|r| row_to_job(&r)).transpose()
}

/// Finds a job owned by a specific user.
pub async fn find_owned(pool: &Pool, job_id: &Uuid, user_id: &Uuid) -> Result<Option<PrintJob>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM print_jobs
            WHERE id = $1 AND user_id = $2
            "#,
            &[job_id, user_id],
        )
        .await?;
    row.map(|r| row_to_job(&r)).transpose()
}

/// Lists a user's jobs, newest first, with the total count.
pub async fn list_for_user(
    pool: &Pool,
    user_id: &Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PrintJob>, i64)> {
    let client = pool.get().await?;

    let rows = client
        .query(
            r#"
            SELECT *
            FROM print_jobs
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            &[user_id, &limit, &offset],
        )
        .await?;

    let total_row = client
        .query_one(
            r#"
            SELECT COUNT(*) AS total
            FROM print_jobs
            WHERE user_id = $1
            "#,
            &[user_id],
        )
        .await?;
    let total: i64 = total_row
        .try_get("total")
        .map_err(|_| AppError::MissingData("total".to_string()))?;

    let jobs = rows.iter().map(row_to_job).collect::<Result<Vec<_>>>()?;
    Ok((jobs, total))
}

/// Lists a user's dispatchable jobs (pending + processing), oldest first,
/// the order booths work through them.
pub async fn list_active_for_user(pool: &Pool, user_id: &Uuid) -> Result<Vec<PrintJob>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT *
            FROM print_jobs
            WHERE user_id = $1 AND status = ANY($2)
            ORDER BY created_at ASC
            "#,
            &[user_id, &vec![JobStatus::Pending, JobStatus::Processing]],
        )
        .await?;
    rows.iter().map(row_to_job).collect()
}

/// Applies a status-preconditioned transition.
///
/// The precondition is the optimistic-concurrency guard: two racing
/// terminal transitions (complete vs cancel, sweep vs complete) can never
/// both match.
///
/// # Returns
///
/// The updated job, or `None` when the job was no longer in any of the
/// `from` states.
pub async fn transition(
    pool: &Pool,
    job_id: &Uuid,
    from: &[JobStatus],
    to: JobStatus,
) -> Result<Option<PrintJob>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE print_jobs
            SET status = $3
            WHERE id = $1 AND status = ANY($2)
            RETURNING *
            "#,
            &[job_id, &from.to_vec(), &to],
        )
        .await?;
    row.map(|r| row_to_job(&r)).transpose()
}

/// Completes a job, stamping the fulfilling booth and print time.
pub async fn complete(
    pool: &Pool,
    job_id: &Uuid,
    from: &[JobStatus],
    booth_id: Option<Uuid>,
) -> Result<Option<PrintJob>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE print_jobs
            SET status = 'completed', printed_by_booth = $3, printed_at = NOW()
            WHERE id = $1 AND status = ANY($2)
            RETURNING *
            "#,
            &[job_id, &from.to_vec(), &booth_id],
        )
        .await?;
    row.map(|r| row_to_job(&r)).transpose()
}

/// Selects jobs past their TTL that the sweep may reap.
///
/// `processing` rows are skipped; an in-flight dispatch must not have its
/// file deleted underneath it.
pub async fn list_expired(pool: &Pool, now: DateTime<Utc>) -> Result<Vec<PrintJob>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT *
            FROM print_jobs
            WHERE delete_after < $1 AND status <> 'processing'
            "#,
            &[&now],
        )
        .await?;
    rows.iter().map(row_to_job).collect()
}

/// Hard-deletes an expired job, re-checking the status precondition.
///
/// # Returns
///
/// The storage reference to clean up, or `None` when the row was already
/// gone or moved to `processing` since selection.
pub async fn delete_expired(pool: &Pool, job_id: &Uuid) -> Result<Option<String>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            DELETE FROM print_jobs
            WHERE id = $1 AND status <> 'processing'
            RETURNING storage_ref
            "#,
            &[job_id],
        )
        .await?;
    row.map(|r| {
        r.try_get("storage_ref")
            .map_err(|_| AppError::MissingData("storage_ref".to_string()))
    })
    .transpose()
}

/// Collects the storage references of every job owned by a user, used
/// for file cleanup before a cascading user delete.
pub async fn storage_refs_for_user(pool: &Pool, user_id: &Uuid) -> Result<Vec<String>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT storage_ref
            FROM print_jobs
            WHERE user_id = $1
            "#,
            &[user_id],
        )
        .await?;
    rows.iter()
        .map(|r| {
            r.try_get("storage_ref")
                .map_err(|_| AppError::MissingData("storage_ref".to_string()))
        })
        .collect()
}
