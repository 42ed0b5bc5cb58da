use axum::{
    Extension,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::time::{Duration, timeout};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::AuthUser,
    models::print_job::{JobStatus, PrintJob, PrintSettings},
    repositories::print_job as job_repo,
    services::jobs as jobs_service,
    state::AppState,
};

/// How long a single multipart field read may take.
const UPLOAD_TIMEOUT_SECS: u64 = 120;
/// How long opening the stored bytes may take before the request gives
/// up instead of leaking a hung upstream fetch.
pub const STREAM_OPEN_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize)]
pub struct ListJobsQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

/// A job as returned by the API: the storage reference stays internal.
#[derive(Serialize)]
pub struct JobPayload {
    pub id: Uuid,
    pub file_name: String,
    pub file_size: i64,
    pub points_used: i32,
    pub status: JobStatus,
    pub print_settings: PrintSettings,
    pub created_at: DateTime<Utc>,
    pub printed_by_booth: Option<Uuid>,
    pub printed_at: Option<DateTime<Utc>>,
}

impl From<&PrintJob> for JobPayload {
    fn from(job: &PrintJob) -> Self {
        Self {
            id: job.id,
            file_name: job.file_name.clone(),
            file_size: job.file_size,
            points_used: job.points_used,
            status: job.status,
            print_settings: job.print_settings.clone(),
            created_at: job.created_at,
            printed_by_booth: job.printed_by_booth,
            printed_at: job.printed_at,
        }
    }
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub job: JobPayload,
    pub direct_url: Option<String>,
    pub proxy_url: String,
}

#[derive(Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobPayload>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

fn parse_enum_field<T: DeserializeOwned>(name: &str, value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_lowercase()))
        .map_err(|_| AppError::Validation(format!("Invalid {}: {}", name, value)))
}

fn parse_int_field(name: &str, value: &str) -> Result<i32> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("Invalid {}: {}", name, value)))
}

fn parse_bool_field(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Validation(format!(
            "Invalid {}: {}",
            name, other
        ))),
    }
}

/// Handles a job upload: one `file` part plus flat settings fields.
#[axum::debug_handler]
pub async fn upload(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    tracing::info!("📤 Upload from user: {}", auth_user.id);

    let mut file_name: Option<String> = None;
    let mut file_bytes: Option<bytes::Bytes> = None;
    let mut settings = PrintSettings::default();

    let timeout_duration = Duration::from_secs(UPLOAD_TIMEOUT_SECS);

    loop {
        match timeout(timeout_duration, multipart.next_field()).await {
            Ok(Ok(Some(field))) => {
                let field_name = field.name().unwrap_or("").to_string();
                match field_name.as_str() {
                    "file" => {
                        file_name = field.file_name().map(|s| s.to_string());
                        file_bytes = Some(
                            field
                                .bytes()
                                .await
                                .map_err(|e| AppError::Multipart(format!("file: {}", e)))?,
                        );
                    }
                    "copies" => {
                        let text = field
                            .text()
                            .await
                            .map_err(|e| AppError::Multipart(format!("copies: {}", e)))?;
                        settings.copies = parse_int_field("copies", &text)?;
                    }
                    "page_range" => {
                        let text = field
                            .text()
                            .await
                            .map_err(|e| AppError::Multipart(format!("page_range: {}", e)))?;
                        settings.page_range = parse_enum_field("page_range", &text)?;
                    }
                    "custom_page_range" => {
                        settings.custom_page_range = field
                            .text()
                            .await
                            .map_err(|e| AppError::Multipart(format!("custom_page_range: {}", e)))?;
                    }
                    "layout" => {
                        let text = field
                            .text()
                            .await
                            .map_err(|e| AppError::Multipart(format!("layout: {}", e)))?;
                        settings.layout = parse_enum_field("layout", &text)?;
                    }
                    "print_both_sides" => {
                        let text = field
                            .text()
                            .await
                            .map_err(|e| AppError::Multipart(format!("print_both_sides: {}", e)))?;
                        settings.print_both_sides = parse_bool_field("print_both_sides", &text)?;
                    }
                    "paper_size" => {
                        let text = field
                            .text()
                            .await
                            .map_err(|e| AppError::Multipart(format!("paper_size: {}", e)))?;
                        settings.paper_size = parse_enum_field("paper_size", &text)?;
                    }
                    "color_mode" => {
                        let text = field
                            .text()
                            .await
                            .map_err(|e| AppError::Multipart(format!("color_mode: {}", e)))?;
                        settings.color_mode = parse_enum_field("color_mode", &text)?;
                    }
                    "total_pages" => {
                        let text = field
                            .text()
                            .await
                            .map_err(|e| AppError::Multipart(format!("total_pages: {}", e)))?;
                        settings.total_pages = parse_int_field("total_pages", &text)?;
                    }
                    _ => {}
                }
            }
            Ok(Ok(None)) => break,
            Ok(Err(e)) => return Err(AppError::Multipart(format!("Parse error: {}", e))),
            Err(_) => return Err(AppError::Multipart("Upload timeout exceeded".into())),
        }
    }

    let bytes = file_bytes.ok_or(AppError::Validation("Missing file".into()))?;
    let file_name = file_name.unwrap_or_else(|| "document.pdf".to_string());

    let result = jobs_service::upload(&state, auth_user.id, &file_name, bytes, settings).await?;

    let response = UploadResponse {
        success: true,
        message: "Upload received. The job is pending at the print booth.".to_string(),
        job: JobPayload::from(&result.job),
        direct_url: result.direct_url,
        proxy_url: result.proxy_url,
    };

    Ok((StatusCode::CREATED, axum::Json(response)).into_response())
}

/// Lists the caller's jobs, newest first.
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(params): Query<ListJobsQuery>,
) -> Result<impl IntoResponse> {
    tracing::debug!(
        "📂 Listing jobs - page: {}, limit: {}",
        params.page,
        params.limit
    );

    let (jobs, total) =
        jobs_service::list_for_user(&state, auth_user.id, params.page, params.limit).await?;

    let response = JobListResponse {
        jobs: jobs.iter().map(JobPayload::from).collect(),
        page: params.page.max(1),
        limit: params.limit.clamp(1, 100),
        total,
    };

    Ok((StatusCode::OK, axum::Json(response)).into_response())
}

/// Returns one of the caller's jobs.
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = job_repo::find_owned(&state.db, &job_id, &auth_user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok((StatusCode::OK, axum::Json(JobPayload::from(&job))).into_response())
}

/// Cancels one of the caller's jobs.
#[axum::debug_handler]
pub async fn cancel_job(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = jobs_service::cancel(&state, auth_user.id, job_id).await?;

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "message": "Job cancelled",
        "id": job.id.to_string(),
        "status": job.status.as_str()
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Strips header-hostile characters from a filename used in
/// Content-Disposition.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            '\n' | '\r' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Builds the streaming response shared by the download and view routes.
pub async fn stream_job_file(
    state: &AppState,
    job: &PrintJob,
    inline: bool,
) -> Result<Response> {
    let _permit = state.download_limiter.acquire().await;

    if !state.storage.exists(&job.storage_ref).await? {
        return Err(AppError::FileUnavailable(format!(
            "Stored file for job {} is gone",
            job.id
        )));
    }

    let stream = timeout(
        Duration::from_secs(STREAM_OPEN_TIMEOUT_SECS),
        state.storage.stream(&job.storage_ref),
    )
    .await
    .map_err(|_| AppError::FileUnavailable("Storage backend timed out".to_string()))??;

    let body = Body::from_stream(stream);

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("application/pdf"),
    );
    headers.insert(
        axum::http::header::CONTENT_LENGTH,
        axum::http::HeaderValue::from(job.file_size as u64),
    );

    let mode = if inline { "inline" } else { "attachment" };
    let safe_filename = sanitize_filename(&job.file_name);
    let disposition = format!(r#"{}; filename="{}""#, mode, safe_filename)
        .parse()
        .unwrap_or_else(|_| axum::http::HeaderValue::from_static("attachment"));
    headers.insert(axum::http::header::CONTENT_DISPOSITION, disposition);

    tracing::info!(
        "📥 Streaming job {} ({} bytes, {})",
        job.id,
        job.file_size,
        mode
    );

    Ok((headers, body).into_response())
}

/// Forced download of one of the caller's jobs.
#[axum::debug_handler]
pub async fn download_job(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
) -> Result<Response> {
    let job = job_repo::find_owned(&state.db, &job_id, &auth_user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    stream_job_file(&state, &job, false).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::print_job::{Layout, PaperSize};

    #[test]
    fn enum_fields_parse_case_insensitively() {
        let layout: Layout = parse_enum_field("layout", "Landscape").unwrap();
        assert_eq!(layout, Layout::Landscape);
        let paper: PaperSize = parse_enum_field("paper_size", " A3 ").unwrap();
        assert_eq!(paper, PaperSize::A3);
        assert!(parse_enum_field::<Layout>("layout", "diagonal").is_err());
    }

    #[test]
    fn bool_fields_accept_form_values() {
        assert!(parse_bool_field("print_both_sides", "true").unwrap());
        assert!(parse_bool_field("print_both_sides", "1").unwrap());
        assert!(!parse_bool_field("print_both_sides", "false").unwrap());
        assert!(!parse_bool_field("print_both_sides", "").unwrap());
        assert!(parse_bool_field("print_both_sides", "maybe").is_err());
    }

    #[test]
    fn filenames_are_header_safe() {
        assert_eq!(
            sanitize_filename("report\"evil\\name\n.pdf"),
            "report_evil_name_.pdf"
        );
        assert_eq!(sanitize_filename("plain.pdf"), "plain.pdf");
    }
}
