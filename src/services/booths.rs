use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::booth::BoothManager;
use crate::repositories::booth as booth_repo;
use crate::services::auth;
use crate::state::AppState;
use crate::validation::identity::validate_password;

/// Creates a booth manager (admin action).
#[allow(clippy::too_many_arguments)]
pub async fn create(
    state: &AppState,
    name: String,
    email: String,
    password: String,
    booth_name: String,
    booth_location: String,
    booth_number: String,
    paper_capacity: i32,
    printer_name: String,
    printer_model: String,
) -> Result<BoothManager> {
    validate_password(&password)?;

    if paper_capacity <= 0 {
        return Err(AppError::Validation(
            "paper_capacity must be positive".to_string(),
        ));
    }

    if booth_repo::find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::DuplicateIdentity(
            "A booth manager with this email already exists".to_string(),
        ));
    }

    let password_hash = auth::hash_password(&password)?;
    let booth = booth_repo::create(
        &state.db,
        &name,
        &email,
        &password_hash,
        &booth_name,
        &booth_location,
        &booth_number,
        paper_capacity,
        &printer_name,
        &printer_model,
    )
    .await?;

    tracing::info!("✅ Booth manager created: {} ({})", booth.id, booth.booth_number);
    Ok(booth)
}

/// Applies an admin update to a booth.
pub async fn update(
    state: &AppState,
    booth_id: Uuid,
    paper_capacity: Option<i32>,
    printer_name: Option<String>,
    printer_model: Option<String>,
    is_active: Option<bool>,
) -> Result<BoothManager> {
    if let Some(capacity) = paper_capacity {
        if capacity <= 0 {
            return Err(AppError::Validation(
                "paper_capacity must be positive".to_string(),
            ));
        }
        let current = booth_repo::find_by_id(&state.db, &booth_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if current.loaded_paper > capacity {
            return Err(AppError::Validation(format!(
                "Capacity {} is below the currently loaded {} sheets",
                capacity, current.loaded_paper
            )));
        }
    }

    let booth = booth_repo::update(
        &state.db,
        &booth_id,
        paper_capacity,
        printer_name.as_deref(),
        printer_model.as_deref(),
        is_active,
    )
    .await?;

    tracing::info!("✅ Booth {} updated", booth_id);
    Ok(booth)
}

/// Self-service paper-count update, gated on the account being active.
pub async fn update_loaded_paper(
    state: &AppState,
    booth_id: Uuid,
    loaded_paper: i32,
) -> Result<BoothManager> {
    let booth = booth_repo::find_by_id(&state.db, &booth_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !booth.is_active {
        return Err(AppError::Forbidden(
            "This booth account is inactive".to_string(),
        ));
    }

    booth_repo::update_loaded_paper(&state.db, &booth_id, loaded_paper)
        .await?
        .ok_or_else(|| {
            AppError::Validation(format!(
                "loaded_paper must be between 0 and the capacity of {}",
                booth.paper_capacity
            ))
        })
}

/// Profile read for the booth itself, gated on the account being active.
pub async fn profile(state: &AppState, booth_id: Uuid) -> Result<BoothManager> {
    let booth = booth_repo::find_by_id(&state.db, &booth_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !booth.is_active {
        return Err(AppError::Forbidden(
            "This booth account is inactive".to_string(),
        ));
    }

    Ok(booth)
}
