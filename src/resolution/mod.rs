/// Resolutions: a doctor's written conclusion for one appointment
///
/// Reads are scoped to the caller's role and identity, writes check the
/// one-resolution-per-appointment and ownership invariants, and every list
/// returns its page together with the total matching row count.

pub mod controller;
pub mod query;
pub mod repository;
pub mod rules;
pub mod service;

pub use controller::ResolutionController;
pub use query::{ListParams, ListQuery, Pagination, Sort, SortKey, SortVariant};
pub use repository::{ResolutionRepository, SqliteResolutionRepository};
pub use service::ResolutionService;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Resolution as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub id: String,
    pub appointment_id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub resolution: String,
    pub visit_date: DateTime<Utc>,
    pub doctor_name: String,
    pub patient_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of a list query: the resolution plus the count of all rows
/// matching the filter, computed by the same statement as the page.
#[derive(Debug, Clone)]
pub struct ResolutionRow {
    pub resolution: Resolution,
    pub total: i64,
}

/// Page of resolutions with the unpaginated total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionPage {
    pub resolutions: Vec<Resolution>,
    pub total: i64,
}

impl ResolutionPage {
    /// Collapse list rows into a page. The total is read from the first row;
    /// an empty page has a total of zero.
    pub fn from_rows(rows: Vec<ResolutionRow>) -> Self {
        let total = rows.first().map(|row| row.total).unwrap_or(0);
        let resolutions = rows.into_iter().map(|row| row.resolution).collect();
        Self { resolutions, total }
    }
}

/// Record handed to the repository on create
#[derive(Debug, Clone)]
pub struct NewResolution {
    pub id: String,
    pub appointment_id: String,
    pub doctor_id: String,
    pub resolution: String,
}

/// Fields a doctor may change after creation
#[derive(Debug, Clone)]
pub struct ResolutionPatch {
    pub resolution: String,
}

/// Appointment a resolution is written for (read-only reference data)
#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub visit_date: DateTime<Utc>,
}

/// Create request body
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateResolutionRequest {
    #[validate(length(min = 1, max = 64, message = "appointmentId is required"))]
    pub appointment_id: String,
    #[validate(length(min = 1, max = 10000, message = "resolution must be 1-10000 characters"))]
    pub resolution: String,
}

/// Update request body
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResolutionRequest {
    #[validate(length(min = 1, max = 10000, message = "resolution must be 1-10000 characters"))]
    pub resolution: String,
}

impl From<UpdateResolutionRequest> for ResolutionPatch {
    fn from(req: UpdateResolutionRequest) -> Self {
        Self {
            resolution: req.resolution,
        }
    }
}

/// Delete response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedResolution {
    pub id: String,
}
