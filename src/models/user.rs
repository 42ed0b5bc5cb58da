use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The capability tier of an account.
///
/// The legacy `isAdmin` boolean collapsed into this enum; use
/// [`Role::is_admin_capable`] where the flag used to be consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "user_role")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[postgres(name = "user")]
    User,
    #[postgres(name = "admin")]
    Admin,
    #[postgres(name = "master")]
    Master,
}

impl Role {
    /// Whether this role may use the admin surface.
    pub fn is_admin_capable(self) -> bool {
        matches!(self, Role::Admin | Role::Master)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Master => "master",
        }
    }

    pub fn from_claim(claim: &str) -> Option<Role> {
        match claim {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "master" => Some(Role::Master),
            _ => None,
        }
    }
}

/// Represents a verified user in the system.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's full name.
    pub name: String,
    /// Seven-digit campus student ID (no leading zero).
    pub student_id: String,
    /// Ten-digit RFID card number (leading zero).
    pub rfid_card_number: String,
    /// The user's email address.
    pub email: String,
    /// The user's phone number.
    pub phone: String,
    /// The user's hashed password.
    pub password: String,
    /// The user's role.
    pub role: Role,
    /// Current print-credit balance.
    pub points: i32,
    /// Whether the account completed email verification.
    pub is_verified: bool,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The public projection of a user returned by API responses.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub student_id: String,
    pub email: String,
    pub role: Role,
    pub points: i32,
    pub is_verified: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            student_id: user.student_id.clone(),
            email: user.email.clone(),
            role: user.role,
            points: user.points,
            is_verified: user.is_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_capability_follows_role() {
        assert!(!Role::User.is_admin_capable());
        assert!(Role::Admin.is_admin_capable());
        assert!(Role::Master.is_admin_capable());
    }

    #[test]
    fn role_claim_round_trip() {
        for role in [Role::User, Role::Admin, Role::Master] {
            assert_eq!(Role::from_claim(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_claim("boothManager"), None);
    }
}
