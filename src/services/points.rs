use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::repositories::user as user_repo;
use crate::state::AppState;

/// Grants points to a user (admin action).
pub async fn grant(state: &AppState, user_id: Uuid, amount: i32) -> Result<i32> {
    if amount <= 0 {
        return Err(AppError::Validation(
            "Point amount must be a positive number".to_string(),
        ));
    }

    let balance = user_repo::add_points(&state.db, &user_id, amount).await?;
    tracing::info!(
        "💰 Granted {} points to user {} (balance: {})",
        amount,
        user_id,
        balance
    );
    Ok(balance)
}

/// Spends points for a job completion.
///
/// The deduction is a single conditional update; on an insufficient
/// balance the error carries required/available so the client can react.
pub async fn spend(state: &AppState, user_id: Uuid, required: i32) -> Result<i32> {
    match user_repo::deduct_points(&state.db, &user_id, required).await? {
        Some(balance) => {
            tracing::info!(
                "💸 Deducted {} points from user {} (balance: {})",
                required,
                user_id,
                balance
            );
            Ok(balance)
        }
        None => {
            let available = user_repo::get_points(&state.db, &user_id).await?;
            Err(AppError::InsufficientPoints {
                required,
                available,
            })
        }
    }
}

/// Returns spent points after a failed side effect (saga compensation).
pub async fn refund(state: &AppState, user_id: Uuid, amount: i32) -> Result<()> {
    let balance = user_repo::add_points(&state.db, &user_id, amount).await?;
    tracing::warn!(
        "↩️ Refunded {} points to user {} (balance: {})",
        amount,
        user_id,
        balance
    );
    Ok(())
}
