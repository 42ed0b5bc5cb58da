use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::booth::BOOTH_ROLE,
    models::user::Role,
    security::jwt,
    state::AppState,
};

/// The authenticated caller, inserted as a request extension by
/// `require_auth` and consumed by handlers.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Raw role claim; booth managers carry a role outside the user enum.
    pub role: String,
}

impl AuthUser {
    pub fn user_role(&self) -> Option<Role> {
        Role::from_claim(&self.role)
    }

    pub fn is_admin_capable(&self) -> bool {
        self.user_role().map(Role::is_admin_capable).unwrap_or(false)
    }

    pub fn is_booth(&self) -> bool {
        self.role == BOOTH_ROLE
    }
}

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// A middleware that requires a valid access token.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response` or an `AppError`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_bearer_token(&request)
        .ok_or_else(|| AppError::Authentication("Missing bearer token".to_string()))?;

    let claims = jwt::verify(&state.config, token, "access")?;

    let auth_user = AuthUser {
        id: claims.subject_id()?,
        name: claims.name,
        email: claims.email,
        role: claims.role,
    };

    tracing::debug!("✅ Authenticated: {} ({})", auth_user.id, auth_user.role);

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// A middleware that requires an admin-capable role. Runs after
/// `require_auth`.
pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::Authentication("Missing bearer token".to_string()))?;

    if !auth_user.is_admin_capable() {
        return Err(AppError::Forbidden(
            "Administrator access required".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

/// A middleware that requires a booth-manager token. Runs after
/// `require_auth`.
pub async fn require_booth(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::Authentication("Missing bearer token".to_string()))?;

    if !auth_user.is_booth() {
        return Err(AppError::Forbidden(
            "Booth manager access required".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_user(role: &str) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "test@campus.edu".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn capability_checks_follow_role_claim() {
        assert!(!auth_user("user").is_admin_capable());
        assert!(auth_user("admin").is_admin_capable());
        assert!(auth_user("master").is_admin_capable());
        assert!(!auth_user("boothManager").is_admin_capable());
        assert!(auth_user("boothManager").is_booth());
        assert!(!auth_user("admin").is_booth());
    }
}
