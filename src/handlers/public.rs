use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    repositories::print_job as job_repo,
    services::jobs as jobs_service,
    state::AppState,
};

use super::jobs::{JobPayload, stream_job_file};

/// Optional body for the kiosk terminal transitions: a booth may
/// identify itself so the fulfilling station lands on the job record.
#[derive(Deserialize, Default)]
pub struct BoothActionRequest {
    pub booth_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct KioskLookupResponse {
    pub name: String,
    pub points: i32,
    pub jobs: Vec<JobPayload>,
}

/// Kiosk lookup by 7-digit student ID or 10-digit RFID number.
///
/// Deliberately unauthenticated: this is the Print Hub terminal surface.
#[axum::debug_handler]
pub async fn lookup_by_identifier(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<impl IntoResponse> {
    let lookup = jobs_service::lookup_by_identifier(&state, &identifier).await?;

    let response = KioskLookupResponse {
        name: lookup.user.name.clone(),
        points: lookup.user.points,
        jobs: lookup.jobs.iter().map(JobPayload::from).collect(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Marks a job completed without a physical print attempt.
#[axum::debug_handler]
pub async fn complete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    payload: Option<Json<BoothActionRequest>>,
) -> Result<impl IntoResponse> {
    let booth_id = payload.and_then(|Json(p)| p.booth_id);
    let job = jobs_service::complete(&state, job_id, booth_id).await?;

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "message": "Job completed",
        "id": job.id.to_string(),
        "status": job.status.as_str(),
        "points_used": job.points_used
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Dispatches a job to the physical printer, then completes it.
#[axum::debug_handler]
pub async fn print_now(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    payload: Option<Json<BoothActionRequest>>,
) -> Result<impl IntoResponse> {
    let booth_id = payload.and_then(|Json(p)| p.booth_id);
    let job = jobs_service::print_now(&state, job_id, booth_id).await?;

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "message": "Job sent to the printer",
        "id": job.id.to_string(),
        "status": job.status.as_str(),
        "points_used": job.points_used
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Inline PDF view used by booth screens; same-origin so kiosk clients
/// never need backend-specific credentials or CORS exceptions.
#[axum::debug_handler]
pub async fn view_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response> {
    let job = job_repo::find_by_id(&state.db, &job_id)
        .await?
        .ok_or(AppError::NotFound)?;

    stream_job_file(&state, &job, true).await
}
