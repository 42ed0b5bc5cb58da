use chrono::{DateTime, Utc};

/// A registration awaiting email verification.
///
/// Holds the same identity fields as a user plus the single active
/// verification code for that email. Promoted to a `User` row on a
/// successful code check, at which point this row is deleted.
#[derive(Clone, Debug)]
pub struct PendingUser {
    pub email: String,
    pub name: String,
    pub student_id: String,
    pub rfid_card_number: String,
    pub phone: String,
    /// Already hashed; reused as-is when the user is promoted.
    pub password: String,
    /// Fixed-width six-digit code, stored and compared as a string.
    pub verification_code: String,
    pub code_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
