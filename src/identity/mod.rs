/// Caller identity
///
/// Identity is established once per request from a signed token and then
/// passed into every domain operation. Downstream code never sees the raw
/// token.

pub mod token;

pub use token::TokenService;

use crate::error::{ClinicError, ClinicResult};
use serde::{Deserialize, Serialize};

/// Role carried in an identity token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }

    pub fn from_str(s: &str) -> ClinicResult<Self> {
        match s.to_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            _ => Err(ClinicError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

/// Verified caller. `subject_id` is a patient id or a doctor id depending on `role`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: String,
    pub role: Role,
}

impl Identity {
    pub fn new(subject_id: impl Into<String>, role: Role) -> Self {
        Self {
            subject_id: subject_id.into(),
            role,
        }
    }

    pub fn doctor(subject_id: impl Into<String>) -> Self {
        Self::new(subject_id, Role::Doctor)
    }

    pub fn patient(subject_id: impl Into<String>) -> Self {
        Self::new(subject_id, Role::Patient)
    }
}
