/// Authorization and precondition checks for resolutions
///
/// Each check fails with its own error kind so the boundary can tell
/// "does not exist" (404) apart from "not yours" (403).
use super::repository::ResolutionRepository;
use super::{Appointment, Resolution};
use crate::error::{ClinicError, ClinicResult};
use crate::identity::{Identity, Role};

/// Caller must hold `role`
pub fn require_role(identity: &Identity, role: Role) -> ClinicResult<()> {
    if identity.role != role {
        tracing::debug!(
            "Rejecting {} {}: operation requires {}",
            identity.role.as_str(),
            identity.subject_id,
            role.as_str()
        );
        return Err(ClinicError::Forbidden(format!(
            "Operation requires the {} role",
            role.as_str()
        )));
    }
    Ok(())
}

/// No resolution may exist yet for the appointment
pub async fn assert_no_existing_resolution(
    repo: &dyn ResolutionRepository,
    appointment_id: &str,
) -> ClinicResult<()> {
    if repo
        .get_resolution_by_appointment_id(appointment_id)
        .await?
        .is_some()
    {
        return Err(ClinicError::DuplicateResolution(appointment_id.to_string()));
    }
    Ok(())
}

/// Load the resolution or fail with `ResolutionNotFound`
pub async fn assert_resolution_exists(
    repo: &dyn ResolutionRepository,
    resolution_id: &str,
) -> ClinicResult<Resolution> {
    repo.get_resolution_by_id(resolution_id)
        .await?
        .ok_or_else(|| ClinicError::ResolutionNotFound(resolution_id.to_string()))
}

/// Only the authoring doctor may change or delete a resolution
pub fn assert_ownership(resolution: &Resolution, doctor_id: &str) -> ClinicResult<()> {
    if resolution.doctor_id != doctor_id {
        return Err(ClinicError::NotOwner(format!(
            "resolution {} belongs to another doctor",
            resolution.id
        )));
    }
    Ok(())
}

/// A doctor may only write a resolution for their own appointment
pub fn assert_appointment_assignable(
    appointment: Option<&Appointment>,
    appointment_id: &str,
    doctor_id: &str,
) -> ClinicResult<()> {
    let appointment = appointment
        .ok_or_else(|| ClinicError::NotFound(format!("appointment {}", appointment_id)))?;

    if appointment.doctor_id != doctor_id {
        return Err(ClinicError::NotOwner(format!(
            "appointment {} belongs to another doctor",
            appointment_id
        )));
    }
    Ok(())
}

/// A single resolution is visible to its doctor and to the appointment's
/// patient. Anyone else gets `ResolutionNotFound` so existence does not leak.
pub fn assert_visible_to(resolution: &Resolution, identity: &Identity) -> ClinicResult<()> {
    let visible = match identity.role {
        Role::Doctor => resolution.doctor_id == identity.subject_id,
        Role::Patient => resolution.patient_id == identity.subject_id,
    };
    if !visible {
        return Err(ClinicError::ResolutionNotFound(resolution.id.clone()));
    }
    Ok(())
}
