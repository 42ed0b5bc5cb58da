use bytes::Bytes;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::print_job::{JobStatus, PrintJob, PrintSettings};
use crate::models::user::User;
use crate::printing::dispatch;
use crate::repositories::{booth as booth_repo, print_job as job_repo, user as user_repo};
use crate::services::points;
use crate::state::AppState;
use crate::storage::backend::normalize_pdf_name;
use crate::validation::identity::{KioskIdentifier, classify_identifier};

/// Maximum accepted upload size.
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;
/// Jobs are reaped this long after upload, whatever their status.
const JOB_TTL_HOURS: i64 = 72;

/// A job plus the URLs a client can fetch it from.
pub struct JobWithUrls {
    pub job: PrintJob,
    pub direct_url: Option<String>,
    pub proxy_url: String,
}

fn proxy_url(state: &AppState, job_id: Uuid) -> String {
    format!(
        "{}/api/print/public/view/{}",
        state.config.public_base_url.trim_end_matches('/'),
        job_id
    )
}

/// Accepts an upload: persists the bytes, creates the pending job.
///
/// The uploader's balance is deliberately not checked here; points are
/// only checked and spent at completion time.
pub async fn upload(
    state: &AppState,
    user_id: Uuid,
    file_name: &str,
    bytes: Bytes,
    settings: PrintSettings,
) -> Result<JobWithUrls> {
    settings.validate()?;

    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(AppError::Validation(format!(
            "File exceeds the {}MB limit",
            MAX_FILE_SIZE / (1024 * 1024)
        )));
    }

    let is_pdf = infer::get(&bytes)
        .map(|kind| kind.mime_type() == "application/pdf")
        .unwrap_or_else(|| bytes.starts_with(b"%PDF"));
    if !is_pdf {
        return Err(AppError::Validation(
            "Only PDF documents can be printed".to_string(),
        ));
    }

    let file_name = normalize_pdf_name(file_name);
    let checksum = hex::encode(blake3::hash(&bytes).as_bytes());
    let points_used = settings.points_required();
    let file_size = bytes.len() as i64;
    let job_id = Uuid::new_v4();

    tracing::info!(
        "📤 Upload from user {}: {} ({} bytes, {} points)",
        user_id,
        file_name,
        file_size,
        points_used
    );

    let stored = state.storage.store(user_id, job_id, bytes).await?;

    let delete_after = Utc::now() + Duration::hours(JOB_TTL_HOURS);
    let job = match job_repo::create(
        &state.db,
        job_id,
        user_id,
        &file_name,
        &stored.reference,
        file_size,
        Some(&checksum),
        points_used,
        &settings,
        delete_after,
    )
    .await
    {
        Ok(job) => job,
        Err(e) => {
            // The bytes are orphaned if the record never lands; reclaim
            // them before surfacing the error.
            if let Err(del_err) = state.storage.delete(&stored.reference).await {
                tracing::warn!("⚠️ Orphan cleanup failed for {}: {}", stored.reference, del_err);
            }
            return Err(e);
        }
    };

    tracing::info!("✅ Job {} created (pending)", job.id);

    Ok(JobWithUrls {
        direct_url: stored.direct_url,
        proxy_url: proxy_url(state, job.id),
        job,
    })
}

/// Lists a user's jobs, newest first.
pub async fn list_for_user(
    state: &AppState,
    user_id: Uuid,
    page: i64,
    limit: i64,
) -> Result<(Vec<PrintJob>, i64)> {
    let limit = limit.clamp(1, 100);
    let offset = (page.max(1) - 1) * limit;
    job_repo::list_for_user(&state.db, &user_id, limit, offset).await
}

/// The kiosk lookup result: who the identifier belongs to and what they
/// have waiting.
pub struct KioskLookup {
    pub user: User,
    pub jobs: Vec<PrintJob>,
}

/// Resolves a student ID or RFID number to its pending work (public).
pub async fn lookup_by_identifier(state: &AppState, identifier: &str) -> Result<KioskLookup> {
    let user = match classify_identifier(identifier)? {
        KioskIdentifier::StudentId(sid) => user_repo::find_by_student_id(&state.db, &sid).await?,
        KioskIdentifier::Rfid(rfid) => user_repo::find_by_rfid(&state.db, &rfid).await?,
    }
    .ok_or(AppError::NotFound)?;

    let jobs = job_repo::list_active_for_user(&state.db, &user.id).await?;

    tracing::debug!(
        "🔎 Kiosk lookup: {} active jobs for user {}",
        jobs.len(),
        user.id
    );

    Ok(KioskLookup { user, jobs })
}

/// Marks a job completed without a physical print attempt.
///
/// Saga order: spend points → preconditioned transition → best-effort
/// file delete. A transition conflict refunds the points.
pub async fn complete(state: &AppState, job_id: Uuid, booth_id: Option<Uuid>) -> Result<PrintJob> {
    let job = job_repo::find_by_id(&state.db, &job_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if job.status.is_terminal() {
        return Err(AppError::Validation(format!(
            "Job is already {}",
            job.status.as_str()
        )));
    }

    points::spend(state, job.user_id, job.points_used).await?;

    let updated = match job_repo::complete(
        &state.db,
        &job_id,
        &[JobStatus::Pending, JobStatus::Processing],
        booth_id,
    )
    .await?
    {
        Some(updated) => updated,
        None => {
            // Lost the race with a cancel/sweep; give the points back.
            points::refund(state, job.user_id, job.points_used).await?;
            return Err(AppError::Validation(
                "Job is no longer pending".to_string(),
            ));
        }
    };

    delete_stored_file(state, &job.storage_ref).await;

    tracing::info!("✅ Job {} completed ({} points)", job_id, job.points_used);
    Ok(updated)
}

/// Completes a job by actually dispatching it to the printer.
///
/// Shares the completion saga; a dispatch failure refunds the points,
/// marks the job failed and leaves the stored file untouched so the job
/// can be retried from a fresh upload or inspected.
pub async fn print_now(state: &AppState, job_id: Uuid, booth_id: Option<Uuid>) -> Result<PrintJob> {
    let job = job_repo::find_by_id(&state.db, &job_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if job.status.is_terminal() {
        return Err(AppError::Validation(format!(
            "Job is already {}",
            job.status.as_str()
        )));
    }
    if job.status == JobStatus::Processing {
        return Err(AppError::Validation(
            "Job is already being processed".to_string(),
        ));
    }

    // Booth-specific printer when the kiosk identifies itself.
    let printer = match booth_id {
        Some(id) => booth_repo::find_by_id(&state.db, &id)
            .await?
            .map(|b| b.printer_name),
        None => None,
    }
    .or_else(|| state.config.printer_name.clone());

    points::spend(state, job.user_id, job.points_used).await?;

    // Claim the job so the sweep and concurrent completions stay away
    // while the file is spooling. Exactly one racing print-now wins this
    // preconditioned update.
    if job_repo::transition(&state.db, &job_id, &[JobStatus::Pending], JobStatus::Processing)
        .await?
        .is_none()
    {
        points::refund(state, job.user_id, job.points_used).await?;
        return Err(AppError::Validation(
            "Job is no longer pending".to_string(),
        ));
    }

    let dispatch_result = async {
        let spool = state.storage.materialize(&job.storage_ref).await?;
        let outcome = dispatch::dispatch(&spool.path, &job.print_settings, printer.as_deref()).await;
        if spool.temporary {
            dispatch::schedule_spool_cleanup(spool.path.clone());
        }
        outcome
    }
    .await;

    if let Err(e) = dispatch_result {
        tracing::error!("❌ Dispatch failed for job {}: {}", job_id, e);
        points::refund(state, job.user_id, job.points_used).await?;
        if job_repo::transition(&state.db, &job_id, &[JobStatus::Processing], JobStatus::Failed)
            .await?
            .is_none()
        {
            tracing::error!("❌ Could not mark job {} as failed", job_id);
        }
        return Err(e);
    }

    let updated = match job_repo::complete(&state.db, &job_id, &[JobStatus::Processing], booth_id)
        .await?
    {
        Some(updated) => updated,
        None => {
            // A mark-complete call finalized the job while the document
            // was at the printer. It spent its own points, so this
            // caller's deduction comes back.
            points::refund(state, job.user_id, job.points_used).await?;
            return Err(AppError::Validation(
                "Job was completed concurrently".to_string(),
            ));
        }
    };

    delete_stored_file(state, &job.storage_ref).await;

    tracing::info!(
        "🖨️ Job {} printed and completed ({} points)",
        job_id,
        job.points_used
    );
    Ok(updated)
}

/// Cancels an owned job. Points are never touched by cancellation.
pub async fn cancel(state: &AppState, user_id: Uuid, job_id: Uuid) -> Result<PrintJob> {
    let job = job_repo::find_owned(&state.db, &job_id, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if job.status.is_terminal() {
        return Err(AppError::Validation(format!(
            "Job is already {}",
            job.status.as_str()
        )));
    }

    let updated = job_repo::transition(
        &state.db,
        &job_id,
        &[JobStatus::Pending, JobStatus::Processing],
        JobStatus::Cancelled,
    )
    .await?
    .ok_or_else(|| AppError::Validation("Job is no longer pending".to_string()))?;

    delete_stored_file(state, &job.storage_ref).await;

    tracing::info!("🚫 Job {} cancelled by owner", job_id);
    Ok(updated)
}

/// Reaps jobs past their TTL along with their stored bytes.
///
/// Runs on a timer; the status precondition inside `delete_expired`
/// keeps it from racing an in-flight dispatch.
pub async fn cleanup_expired_jobs(state: &AppState) -> Result<u64> {
    let expired = job_repo::list_expired(&state.db, Utc::now()).await?;
    let mut reaped = 0u64;

    for job in expired {
        match job_repo::delete_expired(&state.db, &job.id).await? {
            Some(storage_ref) => {
                delete_stored_file(state, &storage_ref).await;
                reaped += 1;
                tracing::debug!("🧹 Reaped expired job {}", job.id);
            }
            None => {
                tracing::debug!("🧹 Skipped job {} (state changed since selection)", job.id);
            }
        }
    }

    Ok(reaped)
}

/// Best-effort file deletion: failures are logged, never propagated, so
/// storage cleanup cannot strand a job in an inconsistent status.
async fn delete_stored_file(state: &AppState, storage_ref: &str) {
    if let Err(e) = state.storage.delete(storage_ref).await {
        tracing::warn!("⚠️ Failed to delete stored file {}: {}", storage_ref, e);
    }
}
