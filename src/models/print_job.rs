use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a print job.
///
/// Transitions only move forward: pending → processing → completed,
/// pending/processing → cancelled, pending/processing → failed. Nothing
/// leaves completed, cancelled or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "job_status")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[postgres(name = "pending")]
    Pending,
    #[postgres(name = "processing")]
    Processing,
    #[postgres(name = "completed")]
    Completed,
    #[postgres(name = "failed")]
    Failed,
    #[postgres(name = "cancelled")]
    Cancelled,
}

impl JobStatus {
    /// Whether a job in this status has reached the end of its lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether the transition graph allows `self → to`.
    pub fn allows_transition_to(self, to: JobStatus) -> bool {
        match (self, to) {
            (JobStatus::Pending, JobStatus::Processing) => true,
            (JobStatus::Pending, JobStatus::Completed) => true,
            (JobStatus::Processing, JobStatus::Completed) => true,
            (JobStatus::Pending, JobStatus::Cancelled) => true,
            (JobStatus::Processing, JobStatus::Cancelled) => true,
            (JobStatus::Pending, JobStatus::Failed) => true,
            (JobStatus::Processing, JobStatus::Failed) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageRange {
    All,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    A4,
    A3,
    Letter,
    Legal,
}

impl PaperSize {
    /// The CUPS `media` name for this size.
    pub fn media_name(self) -> &'static str {
        match self {
            PaperSize::A4 => "A4",
            PaperSize::A3 => "A3",
            PaperSize::Letter => "Letter",
            PaperSize::Legal => "Legal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Color,
    Bw,
}

/// Print options chosen at upload time, persisted as `jsonb`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintSettings {
    pub copies: i32,
    pub page_range: PageRange,
    #[serde(default)]
    pub custom_page_range: String,
    pub layout: Layout,
    pub print_both_sides: bool,
    pub paper_size: PaperSize,
    pub color_mode: ColorMode,
    pub total_pages: i32,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            copies: 1,
            page_range: PageRange::All,
            custom_page_range: String::new(),
            layout: Layout::Portrait,
            print_both_sides: false,
            paper_size: PaperSize::A4,
            color_mode: ColorMode::Bw,
            total_pages: 0,
        }
    }
}

impl PrintSettings {
    /// Points charged for a job with these settings.
    ///
    /// Tracks total distinct pages to process, not copies × pages, with a
    /// floor of one point.
    pub fn points_required(&self) -> i32 {
        if self.total_pages > 0 {
            self.total_pages
        } else {
            1
        }
    }

    /// Checks the cross-field rules the individual types cannot express.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AppError;

        if self.copies < 1 {
            return Err(AppError::Validation(
                "copies must be at least 1".to_string(),
            ));
        }
        if self.total_pages < 0 {
            return Err(AppError::Validation(
                "total_pages cannot be negative".to_string(),
            ));
        }
        if self.page_range == PageRange::Custom {
            if self.custom_page_range.trim().is_empty() {
                return Err(AppError::Validation(
                    "custom_page_range is required when page_range is custom".to_string(),
                ));
            }
            // CUPS page-ranges grammar: digits, commas and dashes only.
            if !self
                .custom_page_range
                .chars()
                .all(|c| c.is_ascii_digit() || c == ',' || c == '-')
            {
                return Err(AppError::Validation(
                    "custom_page_range may only contain digits, commas and dashes".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Represents an uploaded document and its lifecycle state.
#[derive(Clone, Debug)]
pub struct PrintJob {
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Original file name, display only.
    pub file_name: String,
    /// Opaque storage-backend reference locating the bytes.
    pub storage_ref: String,
    pub file_size: i64,
    /// BLAKE3 checksum of the uploaded bytes, hex-encoded.
    pub checksum: Option<String>,
    /// Fixed at upload time; the authoritative deduction amount.
    pub points_used: i32,
    pub print_settings: PrintSettings,
    pub status: JobStatus,
    /// Hard-delete deadline for the TTL sweep (72 h from upload).
    pub delete_after: DateTime<Utc>,
    pub printed_by_booth: Option<Uuid>,
    pub printed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_graph_is_one_directional() {
        use JobStatus::*;

        assert!(Pending.allows_transition_to(Processing));
        assert!(Pending.allows_transition_to(Completed));
        assert!(Processing.allows_transition_to(Completed));
        assert!(Pending.allows_transition_to(Cancelled));
        assert!(Processing.allows_transition_to(Cancelled));
        assert!(Pending.allows_transition_to(Failed));
        assert!(Processing.allows_transition_to(Failed));

        for terminal in [Completed, Cancelled, Failed] {
            for to in [Pending, Processing, Completed, Cancelled, Failed] {
                assert!(
                    !terminal.allows_transition_to(to),
                    "{:?} must not leave terminal state",
                    terminal
                );
            }
        }
        assert!(!Processing.allows_transition_to(Pending));
    }

    #[test]
    fn points_track_pages_not_copies() {
        let settings = PrintSettings {
            total_pages: 5,
            copies: 3,
            ..Default::default()
        };
        assert_eq!(settings.points_required(), 5);
    }

    #[test]
    fn points_floor_is_one() {
        let settings = PrintSettings {
            total_pages: 0,
            ..Default::default()
        };
        assert_eq!(settings.points_required(), 1);
    }

    #[test]
    fn custom_range_requires_value() {
        let mut settings = PrintSettings {
            page_range: PageRange::Custom,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        settings.custom_page_range = "1-3,7".to_string();
        assert!(settings.validate().is_ok());

        settings.custom_page_range = "1-3;DROP".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn settings_json_round_trip() {
        let settings = PrintSettings {
            copies: 2,
            page_range: PageRange::Custom,
            custom_page_range: "2-4".to_string(),
            layout: Layout::Landscape,
            print_both_sides: true,
            paper_size: PaperSize::Letter,
            color_mode: ColorMode::Color,
            total_pages: 3,
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"landscape\""));
        assert!(json.contains("\"letter\""));
        let back: PrintSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
