use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::AuthUser,
    models::user::UserSummary,
    services::auth as auth_service,
    state::AppState,
    validation::identity::*,
};

/// The request payload for user registration.
#[derive(Deserialize, Validate, Debug)]
pub struct RegisterRequest {
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    #[garde(skip)]
    pub student_id: String,
    #[garde(skip)]
    pub phone: String,
    #[garde(skip)]
    pub rfid_card_number: String,
}

/// The request payload for code verification.
#[derive(Deserialize, Debug)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

/// The request payload for resending a verification code.
#[derive(Deserialize, Debug)]
pub struct ResendRequest {
    pub email: String,
}

/// The request payload for user and booth login.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The request payload for refreshing an access token.
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// The request payload for changing a user's password.
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// The request payload for the account-recovery shortcut.
#[derive(Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub email: String,
}

/// The response payload carrying a fresh token pair.
#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub user: Option<UserSummary>,
    pub access_token: String,
    pub refresh_token: String,
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("📝 Register attempt for {}", payload.email);

    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    validate_student_id(&payload.student_id)?;
    validate_rfid(&payload.rfid_card_number)?;
    validate_phone(&payload.phone)?;

    let outcome = auth_service::register(
        &state,
        payload.name.trim().to_string(),
        payload.email.trim().to_lowercase(),
        payload.password,
        payload.student_id,
        payload.phone,
        payload.rfid_card_number,
    )
    .await?;

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "message": "Registration received. Check your email for the verification code.",
        "email": outcome.email,
        "mail_sent": outcome.mail_sent
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::CREATED, body).into_response())
}

/// Handles verification-code submission.
#[axum::debug_handler]
pub async fn verify(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Response> {
    let email = payload.email.trim().to_lowercase();
    let (user, tokens) = auth_service::verify(&state, &email, &payload.code).await?;

    let response = SessionResponse {
        success: true,
        message: "Account verified. Welcome!".to_string(),
        user: Some(UserSummary::from(&user)),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles resending the verification code.
#[axum::debug_handler]
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(payload): Json<ResendRequest>,
) -> Result<Response> {
    let email = payload.email.trim().to_lowercase();
    let mail_sent = auth_service::resend_verification(&state, &email).await?;

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "message": "A new verification code has been issued.",
        "mail_sent": mail_sent
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    let email = payload.email.trim().to_lowercase();
    let (user, tokens) = auth_service::login(&state, &email, &payload.password).await?;

    let response = SessionResponse {
        success: true,
        message: "Login successful".to_string(),
        user: Some(UserSummary::from(&user)),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles booth-manager login.
#[axum::debug_handler]
pub async fn booth_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    let email = payload.email.trim().to_lowercase();
    let tokens = auth_service::booth_login(&state, &email, &payload.password).await?;

    let response = SessionResponse {
        success: true,
        message: "Login successful".to_string(),
        user: None,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Re-issues an access token from a refresh token.
#[axum::debug_handler]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Response> {
    let access_token = auth_service::refresh(&state, &payload.refresh_token)?;

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "access_token": access_token
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Handles changing the caller's password.
#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Response> {
    validate_password(&payload.new_password)?;

    auth_service::change_password(
        &state,
        auth_user.id,
        &payload.old_password,
        &payload.new_password,
    )
    .await?;

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "message": "Password changed successfully"
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Handles the account-recovery shortcut.
#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Response> {
    let email = payload.email.trim().to_lowercase();
    let mail_sent = auth_service::reset_password(&state, &email).await?;

    // Degraded success: the password was rotated even when the mail
    // could not go out, and the caller needs to know which happened.
    let message = if mail_sent {
        "A temporary password has been emailed to you."
    } else {
        "A temporary password was issued but the email could not be sent. Contact support."
    };

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "message": message,
        "mail_sent": mail_sent
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}
