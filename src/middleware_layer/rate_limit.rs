use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sonic_rs::JsonValueTrait;
use std::net::SocketAddr;
use std::time::Duration;

use crate::{error::AppError, state::AppState};

/// Registration attempts allowed per IP per window.
const REGISTER_MAX_ATTEMPTS: usize = 3;
const REGISTER_WINDOW_SECS: u64 = 3600;

/// Login attempts allowed per email per window.
const LOGIN_MAX_ATTEMPTS: usize = 5;
const LOGIN_WINDOW_SECS: u64 = 900;

/// Extracts the real IP address from the request extensions.
///
/// # Arguments
///
/// * `req` - The incoming request.
///
/// # Returns
///
/// The IP address as a string, or "unknown" if not found.
fn extract_real_ip(req: &Request<Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// A middleware that rate limits user registration by source IP.
pub async fn rate_limit_register(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = extract_real_ip(&req);
    let key = format!("register:{}", ip);

    if let Some(retry_secs) = state
        .auth_throttle
        .check(
            &key,
            REGISTER_MAX_ATTEMPTS,
            Duration::from_secs(REGISTER_WINDOW_SECS),
        )
        .await
    {
        return AppError::RateLimitExceeded(format!(
            "Registration limit exceeded. Try again in {} minutes",
            retry_secs.div_ceil(60)
        ))
        .into_response();
    }

    next.run(req).await
}

/// A middleware that rate limits login attempts by submitted email.
pub async fn rate_limit_login(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    fn extract_email_from_body(body_bytes: &[u8]) -> Option<String> {
        if let Ok(json) = sonic_rs::from_slice::<sonic_rs::Value>(body_bytes) {
            json.get("email")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        } else {
            None
        }
    }

    let (parts, body) = req.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    let email = extract_email_from_body(&body_bytes).unwrap_or_else(|| "unknown".to_string());
    let key = format!("login:{}", email);

    if let Some(retry_secs) = state
        .auth_throttle
        .check(
            &key,
            LOGIN_MAX_ATTEMPTS,
            Duration::from_secs(LOGIN_WINDOW_SECS),
        )
        .await
    {
        return AppError::Authentication(format!(
            "Too many failed login attempts. Try again in {} minutes",
            retry_secs.div_ceil(60)
        ))
        .into_response();
    }

    let new_body = Body::from(body_bytes);
    let new_req = Request::from_parts(parts, new_body);

    next.run(new_req).await
}
