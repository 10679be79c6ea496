/// Transport-facing resolution operations
///
/// One method per route verb. Domain errors are translated into a
/// `RequestResult` here and nowhere else.
use super::query::ListParams;
use super::service::ResolutionService;
use super::{
    CreateResolutionRequest, DeletedResolution, Resolution, ResolutionPage,
    UpdateResolutionRequest,
};
use crate::error::{ClinicError, ClinicResult, RequestResult};
use crate::identity::Identity;
use crate::metrics;
use axum::http::StatusCode;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ResolutionController {
    service: Arc<ResolutionService>,
}

impl ResolutionController {
    pub fn new(service: Arc<ResolutionService>) -> Self {
        Self { service }
    }

    pub async fn create_resolution(
        &self,
        identity: &Identity,
        body: CreateResolutionRequest,
    ) -> RequestResult<Resolution> {
        let result = self.service.create_resolution(identity, body).await;
        finish("create", result, StatusCode::CREATED)
    }

    pub async fn update_resolution(
        &self,
        identity: &Identity,
        resolution_id: &str,
        body: UpdateResolutionRequest,
    ) -> RequestResult<Resolution> {
        let result = async {
            check_id(resolution_id)?;
            self.service
                .update_resolution(identity, resolution_id, body)
                .await
        }
        .await;
        finish("update", result, StatusCode::OK)
    }

    pub async fn delete_resolution(
        &self,
        identity: &Identity,
        resolution_id: &str,
    ) -> RequestResult<DeletedResolution> {
        let result = async {
            check_id(resolution_id)?;
            let id = self.service.delete_resolution(identity, resolution_id).await?;
            Ok::<_, ClinicError>(DeletedResolution { id })
        }
        .await;
        finish("delete", result, StatusCode::OK)
    }

    pub async fn get_resolution(
        &self,
        identity: &Identity,
        resolution_id: &str,
    ) -> RequestResult<Resolution> {
        let result = async {
            check_id(resolution_id)?;
            self.service.get_resolution(identity, resolution_id).await
        }
        .await;
        finish("get", result, StatusCode::OK)
    }

    pub async fn get_resolutions_for_patient(
        &self,
        identity: &Identity,
        params: &ListParams,
    ) -> RequestResult<ResolutionPage> {
        let result = self
            .service
            .get_resolutions_for_patient(identity, params)
            .await;
        finish("list_patient", result, StatusCode::OK)
    }

    pub async fn get_resolutions_for_doctor(
        &self,
        identity: &Identity,
        params: &ListParams,
    ) -> RequestResult<ResolutionPage> {
        let result = self
            .service
            .get_resolutions_for_doctor(identity, params)
            .await;
        finish("list_doctor", result, StatusCode::OK)
    }

    pub async fn get_patient_resolutions_by_doctor_specialization_id(
        &self,
        identity: &Identity,
        specialization_id: &str,
        params: &ListParams,
    ) -> RequestResult<ResolutionPage> {
        let result = self
            .service
            .get_patient_resolutions_by_doctor_specialization_id(
                identity,
                specialization_id,
                params,
            )
            .await;
        finish("list_specialization", result, StatusCode::OK)
    }

    pub async fn get_patient_resolutions_by_date(
        &self,
        identity: &Identity,
        params: &ListParams,
    ) -> RequestResult<ResolutionPage> {
        let result = self
            .service
            .get_patient_resolutions_by_date(identity, params)
            .await;
        finish("list_date", result, StatusCode::OK)
    }
}

/// Resolution ids are UUIDs; reject anything else before touching storage
fn check_id(id: &str) -> ClinicResult<()> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| ClinicError::Validation(format!("Invalid resolution id: {}", id)))
}

fn finish<T>(operation: &str, result: ClinicResult<T>, success: StatusCode) -> RequestResult<T> {
    metrics::record_resolution_operation(operation, result.is_ok());
    if let Err(e) = &result {
        tracing::debug!("Resolution {} rejected: {}", operation, e);
    }
    RequestResult::from_result(result, success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::service::tests::seeded;

    #[tokio::test]
    async fn test_status_codes_for_scenario() {
        let (_db, service) = seeded().await;
        let controller = ResolutionController::new(Arc::new(service));
        let d1 = Identity::doctor("D1");

        let created = controller
            .create_resolution(
                &d1,
                CreateResolutionRequest {
                    appointment_id: "A1".to_string(),
                    resolution: "Vasculitis".to_string(),
                },
            )
            .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let r1 = created.value().unwrap();

        let duplicate = controller
            .create_resolution(
                &d1,
                CreateResolutionRequest {
                    appointment_id: "A1".to_string(),
                    resolution: "Again".to_string(),
                },
            )
            .await;
        assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

        let foreign = controller
            .update_resolution(
                &Identity::doctor("D2"),
                &r1.id,
                UpdateResolutionRequest {
                    resolution: "x".to_string(),
                },
            )
            .await;
        assert_eq!(foreign.status(), StatusCode::FORBIDDEN);

        let deleted = controller.delete_resolution(&d1, &r1.id).await;
        assert_eq!(deleted.status(), StatusCode::OK);
        assert_eq!(deleted.value(), Some(DeletedResolution { id: r1.id.clone() }));

        let missing = controller.get_resolution(&d1, &r1.id).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_id_is_bad_request() {
        let (_db, service) = seeded().await;
        let controller = ResolutionController::new(Arc::new(service));

        let result = controller
            .delete_resolution(&Identity::doctor("D1"), "not-a-uuid")
            .await;
        assert_eq!(result.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_repository_failure_is_generic_500() {
        let (db, service) = seeded().await;
        let controller = ResolutionController::new(Arc::new(service));
        db.close().await;

        let result = controller
            .get_resolutions_for_patient(&Identity::patient("P1"), &ListParams::default())
            .await;
        assert_eq!(result.status(), StatusCode::INTERNAL_SERVER_ERROR);
        match result {
            RequestResult::Failure { message, .. } => {
                assert_eq!(message, "Internal server error")
            }
            RequestResult::Success { .. } => panic!("expected failure"),
        }
    }
}
