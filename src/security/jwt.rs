use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Claims embedded in every token issued by the server.
///
/// Access tokens carry enough identity to authorize a request without a
/// database read; refresh tokens reuse the same shape with a different
/// `token_use` so one cannot stand in for the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Standard JWT subject — the account UUID.
    pub sub: String,
    /// Display name captured at issuance.
    pub name: String,
    pub email: String,
    /// `user` / `admin` / `master` / `boothManager`.
    pub role: String,
    /// `access` or `refresh`.
    pub token_use: String,
    /// Issued-at (Unix timestamp, seconds).
    pub iat: i64,
    /// Standard JWT expiry (Unix timestamp, seconds).
    pub exp: i64,
}

impl Claims {
    pub fn subject_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Authentication("Malformed token subject".to_string()))
    }
}

/// An access/refresh token pair issued at login or verification.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn issue(
    config: &Config,
    id: Uuid,
    name: &str,
    email: &str,
    role: &str,
    token_use: &str,
    ttl_seconds: i64,
) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        token_use: token_use.to_string(),
        iat: now,
        exp: now + ttl_seconds,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
}

/// Issues a short-lived access token.
pub fn issue_access_token(
    config: &Config,
    id: Uuid,
    name: &str,
    email: &str,
    role: &str,
) -> Result<String> {
    issue(
        config,
        id,
        name,
        email,
        role,
        "access",
        config.access_token_minutes * 60,
    )
}

/// Issues the access + refresh pair handed out on login/verification.
pub fn issue_token_pair(
    config: &Config,
    id: Uuid,
    name: &str,
    email: &str,
    role: &str,
) -> Result<TokenPair> {
    let access_token = issue_access_token(config, id, name, email, role)?;
    let refresh_token = issue(
        config,
        id,
        name,
        email,
        role,
        "refresh",
        config.refresh_token_days * 86400,
    )?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Verifies a token's signature and expiry and checks its `token_use`.
pub fn verify(config: &Config, token: &str, expected_use: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Authentication("Token expired".to_string())
        }
        _ => AppError::Authentication("Invalid token".to_string()),
    })?;

    if data.claims.token_use != expected_use {
        return Err(AppError::Authentication(format!(
            "Expected {} token",
            expected_use
        )));
    }

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageKind;
    use zeroize::Zeroizing;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: Zeroizing::new(b"unit-test-secret-0123456789abcdef".to_vec()),
            access_token_minutes: 15,
            refresh_token_days: 30,
            storage_kind: StorageKind::Local,
            storage_root: "uploads/jobs".to_string(),
            s3_bucket: String::new(),
            s3_endpoint: None,
            public_base_url: "http://127.0.0.1:3000".to_string(),
            printer_name: None,
            smtp_host: None,
            smtp_username: None,
            smtp_password: None,
            mail_from: "PrintHub <no-reply@printhub.local>".to_string(),
            port: 3000,
        }
    }

    #[test]
    fn access_token_round_trip() {
        let config = test_config();
        let id = Uuid::new_v4();
        let token = issue_access_token(&config, id, "Ada", "ada@campus.edu", "user").unwrap();
        let claims = verify(&config, &token, "access").unwrap();
        assert_eq!(claims.subject_id().unwrap(), id);
        assert_eq!(claims.role, "user");
        assert_eq!(claims.token_use, "access");
    }

    #[test]
    fn refresh_token_cannot_pass_as_access() {
        let config = test_config();
        let pair =
            issue_token_pair(&config, Uuid::new_v4(), "Ada", "ada@campus.edu", "user").unwrap();
        assert!(verify(&config, &pair.refresh_token, "access").is_err());
        assert!(verify(&config, &pair.refresh_token, "refresh").is_ok());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = test_config();
        let token =
            issue_access_token(&config, Uuid::new_v4(), "Ada", "ada@campus.edu", "user").unwrap();
        let mut forged = token.clone();
        forged.pop();
        forged.push(if token.ends_with('a') { 'b' } else { 'a' });
        assert!(verify(&config, &forged, "access").is_err());
    }
}
