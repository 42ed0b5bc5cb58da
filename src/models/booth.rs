use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Staff identity tied to a physical printer station.
#[derive(Clone, Debug)]
pub struct BoothManager {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2 hash.
    pub password: String,
    pub booth_name: String,
    pub booth_location: String,
    /// Unique station number.
    pub booth_number: String,
    pub paper_capacity: i32,
    /// Sheets currently loaded; never exceeds `paper_capacity`.
    pub loaded_paper: i32,
    pub printer_name: String,
    pub printer_model: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Role claim carried by booth-manager tokens. Booth managers live in
/// their own table, so this never touches the `user_role` enum.
pub const BOOTH_ROLE: &str = "boothManager";

/// The projection of a booth manager returned by API responses.
#[derive(Debug, Serialize)]
pub struct BoothSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub booth_name: String,
    pub booth_location: String,
    pub booth_number: String,
    pub paper_capacity: i32,
    pub loaded_paper: i32,
    pub printer_name: String,
    pub printer_model: String,
    pub is_active: bool,
}

impl From<&BoothManager> for BoothSummary {
    fn from(booth: &BoothManager) -> Self {
        Self {
            id: booth.id,
            name: booth.name.clone(),
            email: booth.email.clone(),
            booth_name: booth.booth_name.clone(),
            booth_location: booth.booth_location.clone(),
            booth_number: booth.booth_number.clone(),
            paper_capacity: booth.paper_capacity,
            loaded_paper: booth.loaded_paper,
            printer_name: booth.printer_name.clone(),
            printer_model: booth.printer_model.clone(),
            is_active: booth.is_active,
        }
    }
}
