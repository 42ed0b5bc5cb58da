use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::AuthUser,
    models::booth::BoothSummary,
    models::user::{Role, UserSummary},
    repositories::{print_job as job_repo, user as user_repo},
    services::{booths as booths_service, points as points_service},
    state::AppState,
};

#[derive(Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    50
}

/// Admin edit of a user: any subset of role / points / verification.
#[derive(Deserialize, Debug)]
pub struct UpdateUserRequest {
    pub role: Option<Role>,
    pub points: Option<i32>,
    pub is_verified: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct AddPointsRequest {
    pub amount: i32,
}

#[derive(Deserialize)]
pub struct CreateBoothRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub booth_name: String,
    pub booth_location: String,
    pub booth_number: String,
    pub paper_capacity: i32,
    pub printer_name: String,
    pub printer_model: String,
}

#[derive(Deserialize, Debug)]
pub struct UpdateBoothRequest {
    pub paper_capacity: Option<i32>,
    pub printer_name: Option<String>,
    pub printer_model: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
    pub page: i64,
    pub limit: i64,
}

/// Master accounts may only be touched by a master.
fn guard_master_target(actor: &AuthUser, target_role: Role) -> Result<()> {
    if target_role == Role::Master && actor.user_role() != Some(Role::Master) {
        return Err(AppError::Forbidden(
            "Only a master account may modify a master account".to_string(),
        ));
    }
    Ok(())
}

/// Lists users for the admin panel.
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListUsersQuery>,
) -> Result<impl IntoResponse> {
    let limit = params.limit.clamp(1, 200);
    let offset = (params.page.max(1) - 1) * limit;
    let users = user_repo::list_users(&state.db, limit, offset).await?;

    let response = UserListResponse {
        users: users.iter().map(UserSummary::from).collect(),
        page: params.page.max(1),
        limit,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Applies an admin edit to a user.
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Response> {
    let target = user_repo::find_by_id(&state.db, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    guard_master_target(&actor, target.role)?;
    if payload.role == Some(Role::Master) {
        guard_master_target(&actor, Role::Master)?;
    }

    if let Some(role) = payload.role {
        user_repo::set_role(&state.db, &user_id, role).await?;
        tracing::info!("👤 Role of {} set to {} by {}", user_id, role.as_str(), actor.id);
    }

    if let Some(points) = payload.points {
        if points < 0 {
            return Err(AppError::Validation(
                "points cannot be negative".to_string(),
            ));
        }
        user_repo::set_points(&state.db, &user_id, points).await?;
        tracing::info!("💰 Points of {} set to {} by {}", user_id, points, actor.id);
    }

    if let Some(verified) = payload.is_verified {
        user_repo::set_verified(&state.db, &user_id, verified).await?;
        tracing::info!(
            "✅ Verification of {} set to {} by {}",
            user_id,
            verified,
            actor.id
        );
    }

    let updated = user_repo::find_by_id(&state.db, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok((StatusCode::OK, Json(UserSummary::from(&updated))).into_response())
}

/// Deletes a user; their jobs cascade and their stored files are cleaned
/// up best-effort.
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Response> {
    let target = user_repo::find_by_id(&state.db, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    guard_master_target(&actor, target.role)?;

    let refs = job_repo::storage_refs_for_user(&state.db, &user_id).await?;
    user_repo::delete_user(&state.db, &user_id).await?;

    for storage_ref in &refs {
        if let Err(e) = state.storage.delete(storage_ref).await {
            tracing::warn!("⚠️ Failed to delete stored file {}: {}", storage_ref, e);
        }
    }

    tracing::info!(
        "🗑️ User {} deleted by {} ({} files cleaned up)",
        user_id,
        actor.id,
        refs.len()
    );

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "message": "User deleted",
        "jobs_removed": refs.len()
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Grants points to a user.
#[axum::debug_handler]
pub async fn add_points(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AddPointsRequest>,
) -> Result<Response> {
    let balance = points_service::grant(&state, user_id, payload.amount).await?;

    tracing::info!(
        "💰 {} granted {} points to {} (balance: {})",
        actor.id,
        payload.amount,
        user_id,
        balance
    );

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "message": "Points added",
        "balance": balance
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Creates a booth manager.
#[axum::debug_handler]
pub async fn create_booth(
    State(state): State<AppState>,
    Json(payload): Json<CreateBoothRequest>,
) -> Result<Response> {
    let booth = booths_service::create(
        &state,
        payload.name,
        payload.email.trim().to_lowercase(),
        payload.password,
        payload.booth_name,
        payload.booth_location,
        payload.booth_number,
        payload.paper_capacity,
        payload.printer_name,
        payload.printer_model,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(BoothSummary::from(&booth))).into_response())
}

/// Lists booth managers.
#[axum::debug_handler]
pub async fn list_booths(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let booths = crate::repositories::booth::list(&state.db).await?;
    let summaries: Vec<BoothSummary> = booths.iter().map(BoothSummary::from).collect();
    Ok((StatusCode::OK, Json(summaries)).into_response())
}

/// Applies an admin edit to a booth.
#[axum::debug_handler]
pub async fn update_booth(
    State(state): State<AppState>,
    Path(booth_id): Path<Uuid>,
    Json(payload): Json<UpdateBoothRequest>,
) -> Result<Response> {
    let booth = booths_service::update(
        &state,
        booth_id,
        payload.paper_capacity,
        payload.printer_name,
        payload.printer_model,
        payload.is_active,
    )
    .await?;

    Ok((StatusCode::OK, Json(BoothSummary::from(&booth))).into_response())
}

/// Deletes a booth manager.
#[axum::debug_handler]
pub async fn delete_booth(
    State(state): State<AppState>,
    Path(booth_id): Path<Uuid>,
) -> Result<Response> {
    crate::repositories::booth::delete(&state.db, &booth_id).await?;

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "message": "Booth manager deleted"
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}
