use argon2::{
    Argon2, ParamsBuilder,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use rand::{RngCore, rngs::OsRng};
use tokio_postgres::error::SqlState;
use zeroize::Zeroize;

use crate::error::{AppError, Result};
use crate::models::booth::BOOTH_ROLE;
use crate::models::user::User;
use crate::repositories::{booth as booth_repo, pending_user as pending_repo, user as user_repo};
use crate::security::codes;
use crate::security::jwt::{self, TokenPair};
use crate::state::AppState;

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 6;

/// Verification-code lifetime handed out at registration.
const REGISTER_CODE_TTL_MINUTES: i64 = 30;
/// Lifetime used on resend. Longer than the register TTL on purpose; the
/// asymmetry is inherited behavior and is kept visible here.
const RESEND_CODE_TTL_HOURS: i64 = 24;

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the hashed password.
pub fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Internal(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Internal(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    Ok(password_hash)
}

/// Verifies a password against a hash.
///
/// # Arguments
///
/// * `password` - The password to verify.
/// * `hash` - The hash to verify against.
///
/// # Returns
///
/// A `Result` containing `true` if the password is valid, `false` otherwise.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Hash parse error: {}", e)))?;
    let argon2 = Argon2::default();
    let result = argon2.verify_password(&password_bytes, &parsed_hash).is_ok();

    password_bytes.zeroize();
    Ok(result)
}

/// The outcome of a registration attempt.
pub struct RegistrationOutcome {
    pub email: String,
    /// Whether the verification mail actually went out.
    pub mail_sent: bool,
}

/// Stages a registration as a pending user and mails the code.
///
/// Identity conflicts are only checked against verified users; an
/// abandoned pending registration for the same email is simply replaced.
pub async fn register(
    state: &AppState,
    name: String,
    email: String,
    password: String,
    student_id: String,
    phone: String,
    rfid_card_number: String,
) -> Result<RegistrationOutcome> {
    tracing::info!("📝 Register attempt for {}", email);

    if let Some(field) =
        user_repo::find_identity_conflict(&state.db, &email, &student_id, &rfid_card_number).await?
    {
        return Err(AppError::DuplicateIdentity(format!(
            "An account with this {} already exists",
            field
        )));
    }

    let password_hash = hash_password(&password)?;
    let code = codes::generate_verification_code();
    let expires_at = Utc::now() + Duration::minutes(REGISTER_CODE_TTL_MINUTES);

    pending_repo::upsert(
        &state.db,
        &email,
        &name,
        &student_id,
        &rfid_card_number,
        &phone,
        &password_hash,
        &code,
        expires_at,
    )
    .await?;

    tracing::info!("✅ Pending registration staged for {}", email);

    // Mail failure must not fail registration; the code can be resent.
    let mail_sent = match state.mailer.send_verification_email(&email, &code).await {
        Ok(sent) => sent,
        Err(e) => {
            tracing::error!("❌ Verification mail to {} failed: {}", email, e);
            false
        }
    };

    Ok(RegistrationOutcome { email, mail_sent })
}

/// Verifies a pending registration and promotes it to a user.
pub async fn verify(state: &AppState, email: &str, code: &str) -> Result<(User, TokenPair)> {
    tracing::info!("🔎 Verification attempt for {}", email);

    let pending = pending_repo::find_by_email(&state.db, email)
        .await?
        .ok_or(AppError::NotFound)?;

    if !codes::codes_match(code, &pending.verification_code) {
        return Err(AppError::Validation(
            "Invalid verification code".to_string(),
        ));
    }

    if Utc::now() > pending.code_expires_at {
        return Err(AppError::Expired(
            "Verification code has expired. Request a new one.".to_string(),
        ));
    }

    let user = pending_repo::promote(&state.db, &pending)
        .await
        .map_err(|e| match &e {
            AppError::Database(db_err)
                if db_err.code() == Some(&SqlState::UNIQUE_VIOLATION) =>
            {
                AppError::DuplicateIdentity(
                    "An account with this identity already exists".to_string(),
                )
            }
            _ => e,
        })?;

    tracing::info!("✅ User verified and created: {}", user.id);

    let tokens = jwt::issue_token_pair(
        &state.config,
        user.id,
        &user.name,
        &user.email,
        user.role.as_str(),
    )?;

    Ok((user, tokens))
}

/// Regenerates a verification code for an email still pending.
pub async fn resend_verification(state: &AppState, email: &str) -> Result<bool> {
    if user_repo::find_by_email(&state.db, email).await?.is_some() {
        return Err(AppError::Validation(
            "This account is already verified".to_string(),
        ));
    }

    pending_repo::find_by_email(&state.db, email)
        .await?
        .ok_or(AppError::NotFound)?;

    let code = codes::generate_verification_code();
    let expires_at = Utc::now() + Duration::hours(RESEND_CODE_TTL_HOURS);
    pending_repo::refresh_code(&state.db, email, &code, expires_at).await?;

    tracing::info!("✅ Verification code reissued for {}", email);

    let mail_sent = match state.mailer.send_verification_email(email, &code).await {
        Ok(sent) => sent,
        Err(e) => {
            tracing::error!("❌ Verification mail to {} failed: {}", email, e);
            false
        }
    };

    Ok(mail_sent)
}

/// Authenticates a user and issues a token pair.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<(User, TokenPair)> {
    tracing::info!("🔐 Login attempt for {}", email);

    let user = match user_repo::find_by_email(&state.db, email).await? {
        Some(user) => user,
        None => {
            // A pending registration means the client should redirect to
            // the verification flow rather than show a credential error.
            if pending_repo::find_by_email(&state.db, email).await?.is_some() {
                return Err(AppError::Unverified);
            }
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }
    };

    if !verify_password(password, &user.password)? {
        return Err(AppError::Authentication(
            "Invalid email or password".to_string(),
        ));
    }

    tracing::info!("✅ User authenticated: {}", user.id);

    let tokens = jwt::issue_token_pair(
        &state.config,
        user.id,
        &user.name,
        &user.email,
        user.role.as_str(),
    )?;

    Ok((user, tokens))
}

/// Authenticates a booth manager and issues a token pair.
pub async fn booth_login(state: &AppState, email: &str, password: &str) -> Result<TokenPair> {
    tracing::info!("🔐 Booth login attempt for {}", email);

    let booth = booth_repo::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

    if !verify_password(password, &booth.password)? {
        return Err(AppError::Authentication(
            "Invalid email or password".to_string(),
        ));
    }

    if !booth.is_active {
        return Err(AppError::Forbidden(
            "This booth account is inactive".to_string(),
        ));
    }

    tracing::info!("✅ Booth manager authenticated: {}", booth.id);

    jwt::issue_token_pair(&state.config, booth.id, &booth.name, &booth.email, BOOTH_ROLE)
}

/// Re-issues an access token from a valid refresh token.
pub fn refresh(state: &AppState, refresh_token: &str) -> Result<String> {
    let claims = jwt::verify(&state.config, refresh_token, "refresh")?;
    let id = claims.subject_id()?;
    jwt::issue_access_token(&state.config, id, &claims.name, &claims.email, &claims.role)
}

/// Changes a user's password after checking the current one.
pub async fn change_password(
    state: &AppState,
    user_id: uuid::Uuid,
    old_password: &str,
    new_password: &str,
) -> Result<()> {
    tracing::info!("🔑 Changing password for user: {}", user_id);

    let user = user_repo::find_by_id(&state.db, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !verify_password(old_password, &user.password)? {
        return Err(AppError::Authentication(
            "Invalid current password".to_string(),
        ));
    }

    let new_hash = hash_password(new_password)?;
    user_repo::update_password(&state.db, &user_id, &new_hash).await?;

    tracing::info!("✅ Password changed for user: {}", user_id);
    Ok(())
}

/// Account-recovery shortcut: mails a fresh temporary password.
///
/// # Returns
///
/// Whether the mail actually went out; `false` is a degraded success the
/// handler surfaces to the caller.
pub async fn reset_password(state: &AppState, email: &str) -> Result<bool> {
    let user = user_repo::find_by_email(&state.db, email)
        .await?
        .ok_or(AppError::NotFound)?;

    let temp_password = codes::generate_temp_password();
    let temp_hash = hash_password(&temp_password)?;
    user_repo::update_password(&state.db, &user.id, &temp_hash).await?;

    tracing::info!("🔑 Temporary password issued for user: {}", user.id);

    match state
        .mailer
        .send_temp_password_email(email, &temp_password)
        .await
    {
        Ok(sent) => Ok(sent),
        Err(e) => {
            tracing::error!("❌ Reset mail to {} failed: {}", email, e);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same input").unwrap();
        let b = hash_password("same input").unwrap();
        assert_ne!(a, b);
    }
}
