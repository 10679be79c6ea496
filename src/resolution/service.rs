/// Resolution query and mutation service
///
/// Stateless: every call orchestrates rule checks and repository calls for
/// one request. The subject of every query is taken from the verified
/// identity, never from request parameters.
use super::query::{
    parse_date, DateResolutionFilter, DoctorResolutionFilter, ListFilter, ListParams, ListQuery,
    PatientResolutionFilter, SpecializationResolutionFilter,
};
use super::repository::ResolutionRepository;
use super::rules;
use super::{
    CreateResolutionRequest, NewResolution, Resolution, ResolutionPage, ResolutionPatch,
    ResolutionRow, UpdateResolutionRequest,
};
use crate::config::PaginationConfig;
use crate::error::{ClinicError, ClinicResult};
use crate::identity::{Identity, Role};
use crate::specialization::SpecializationRepository;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Resolution service
pub struct ResolutionService {
    repo: Arc<dyn ResolutionRepository>,
    specializations: Arc<dyn SpecializationRepository>,
    pagination: PaginationConfig,
}

impl ResolutionService {
    pub fn new(
        repo: Arc<dyn ResolutionRepository>,
        specializations: Arc<dyn SpecializationRepository>,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            repo,
            specializations,
            pagination,
        }
    }

    // ========== Mutations ==========

    /// Create a resolution for one of the calling doctor's appointments
    pub async fn create_resolution(
        &self,
        identity: &Identity,
        data: CreateResolutionRequest,
    ) -> ClinicResult<Resolution> {
        rules::require_role(identity, Role::Doctor)?;
        data.validate()
            .map_err(|e| ClinicError::Validation(e.to_string()))?;

        let appointment = self.repo.get_appointment_by_id(&data.appointment_id).await?;
        rules::assert_appointment_assignable(
            appointment.as_ref(),
            &data.appointment_id,
            &identity.subject_id,
        )?;
        rules::assert_no_existing_resolution(self.repo.as_ref(), &data.appointment_id).await?;

        let record = NewResolution {
            id: Uuid::now_v7().to_string(),
            appointment_id: data.appointment_id,
            doctor_id: identity.subject_id.clone(),
            resolution: data.resolution,
        };

        let resolution = self.repo.create_resolution(record).await?;
        tracing::info!(
            "Resolution {} created for appointment {} by doctor {}",
            resolution.id,
            resolution.appointment_id,
            resolution.doctor_id
        );
        Ok(resolution)
    }

    /// Replace the content of a resolution owned by the calling doctor
    pub async fn update_resolution(
        &self,
        identity: &Identity,
        resolution_id: &str,
        patch: UpdateResolutionRequest,
    ) -> ClinicResult<Resolution> {
        rules::require_role(identity, Role::Doctor)?;
        patch
            .validate()
            .map_err(|e| ClinicError::Validation(e.to_string()))?;

        let existing = rules::assert_resolution_exists(self.repo.as_ref(), resolution_id).await?;
        rules::assert_ownership(&existing, &identity.subject_id)?;

        let updated = self
            .repo
            .update_resolution(
                resolution_id,
                ResolutionPatch::from(patch),
                &identity.subject_id,
            )
            .await?;
        tracing::info!("Resolution {} updated by doctor {}", updated.id, identity.subject_id);
        Ok(updated)
    }

    /// Delete a resolution owned by the calling doctor, returning its id
    pub async fn delete_resolution(
        &self,
        identity: &Identity,
        resolution_id: &str,
    ) -> ClinicResult<String> {
        rules::require_role(identity, Role::Doctor)?;

        let existing = rules::assert_resolution_exists(self.repo.as_ref(), resolution_id).await?;
        rules::assert_ownership(&existing, &identity.subject_id)?;

        let id = self
            .repo
            .delete_resolution(resolution_id, &identity.subject_id)
            .await?;
        tracing::info!("Resolution {} deleted by doctor {}", id, identity.subject_id);
        Ok(id)
    }

    // ========== Queries ==========

    /// Single resolution, visible to its doctor and its patient
    pub async fn get_resolution(
        &self,
        identity: &Identity,
        resolution_id: &str,
    ) -> ClinicResult<Resolution> {
        let resolution = rules::assert_resolution_exists(self.repo.as_ref(), resolution_id).await?;
        rules::assert_visible_to(&resolution, identity)?;
        Ok(resolution)
    }

    /// The calling patient's resolutions, optionally narrowed by date
    pub async fn get_resolutions_for_patient(
        &self,
        identity: &Identity,
        params: &ListParams,
    ) -> ClinicResult<ResolutionPage> {
        rules::require_role(identity, Role::Patient)?;

        let filter = PatientResolutionFilter {
            patient_id: identity.subject_id.clone(),
            date: parse_date(params.date.as_deref())?,
            query: self.list_query(params)?,
        };

        collect_page(filter, |f| async move { self.repo.get_resolutions(&f).await }).await
    }

    /// Resolutions written by the calling doctor, optionally narrowed by date
    pub async fn get_resolutions_for_doctor(
        &self,
        identity: &Identity,
        params: &ListParams,
    ) -> ClinicResult<ResolutionPage> {
        rules::require_role(identity, Role::Doctor)?;

        let filter = DoctorResolutionFilter {
            doctor_id: identity.subject_id.clone(),
            date: parse_date(params.date.as_deref())?,
            query: self.list_query(params)?,
        };

        collect_page(filter, |f| async move { self.repo.get_my_resolutions(&f).await }).await
    }

    /// The calling patient's resolutions from doctors of one specialization
    pub async fn get_patient_resolutions_by_doctor_specialization_id(
        &self,
        identity: &Identity,
        specialization_id: &str,
        params: &ListParams,
    ) -> ClinicResult<ResolutionPage> {
        rules::require_role(identity, Role::Patient)?;

        let query = self.list_query(params)?;
        if !self
            .specializations
            .specialization_exists(specialization_id)
            .await?
        {
            return Err(ClinicError::NotFound(format!(
                "specialization {}",
                specialization_id
            )));
        }

        let filter = SpecializationResolutionFilter {
            patient_id: identity.subject_id.clone(),
            specialization_id: specialization_id.to_string(),
            query,
        };

        collect_page(filter, |f| async move {
            self.repo
                .get_patient_resolutions_by_doctor_specialization_id(&f)
                .await
        })
        .await
    }

    /// The calling patient's resolutions for appointments on one date
    pub async fn get_patient_resolutions_by_date(
        &self,
        identity: &Identity,
        params: &ListParams,
    ) -> ClinicResult<ResolutionPage> {
        rules::require_role(identity, Role::Patient)?;

        let date = parse_date(params.date.as_deref())?
            .ok_or_else(|| ClinicError::Validation("date is required".to_string()))?;

        let filter = DateResolutionFilter {
            patient_id: identity.subject_id.clone(),
            date,
            query: self.list_query(params)?,
        };

        collect_page(filter, |f| async move {
            self.repo.get_patient_resolutions_by_date(&f).await
        })
        .await
    }

    fn list_query(&self, params: &ListParams) -> ClinicResult<ListQuery> {
        ListQuery::from_params(params, &self.pagination)
    }
}

/// Run a list query and fold its rows into a page. A window past the end
/// returns no rows, so the total is re-read from the filter's first row.
async fn collect_page<F, Fetch, Fut>(filter: F, fetch: Fetch) -> ClinicResult<ResolutionPage>
where
    F: ListFilter,
    Fetch: Fn(F) -> Fut,
    Fut: Future<Output = ClinicResult<Vec<ResolutionRow>>>,
{
    let past_start = filter.list_query().pagination.offset > 0;
    let head = filter.head();

    let rows = fetch(filter).await?;
    if rows.is_empty() && past_start {
        let total = ResolutionPage::from_rows(fetch(head).await?).total;
        return Ok(ResolutionPage {
            resolutions: Vec::new(),
            total,
        });
    }

    Ok(ResolutionPage::from_rows(rows))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::resolution::SqliteResolutionRepository;
    use crate::specialization::SqliteSpecializationRepository;
    use crate::test_support::{seed_appointment, seed_doctor, seed_patient, seed_specialization};
    use sqlx::SqlitePool;

    pub(crate) fn service_for(db: &SqlitePool) -> ResolutionService {
        ResolutionService::new(
            Arc::new(SqliteResolutionRepository::new(db.clone())),
            Arc::new(SqliteSpecializationRepository::new(db.clone())),
            PaginationConfig::default(),
        )
    }

    /// Two doctors (D1 House, D2 Wilson), two patients (P1 Doe, P2 Roe),
    /// appointment A1 between P1 and D1.
    pub(crate) async fn seeded() -> (SqlitePool, ResolutionService) {
        let db = crate::db::memory_pool().await;
        seed_doctor(&db, "D1", "Gregory", "House").await;
        seed_doctor(&db, "D2", "James", "Wilson").await;
        seed_patient(&db, "P1", "Jane", "Doe").await;
        seed_patient(&db, "P2", "John", "Roe").await;
        seed_appointment(&db, "A1", "P1", "D1", "2024-03-01T10:00:00+00:00").await;
        let service = service_for(&db);
        (db, service)
    }

    fn create_request(appointment_id: &str, text: &str) -> CreateResolutionRequest {
        CreateResolutionRequest {
            appointment_id: appointment_id.to_string(),
            resolution: text.to_string(),
        }
    }

    fn update_request(text: &str) -> UpdateResolutionRequest {
        UpdateResolutionRequest {
            resolution: text.to_string(),
        }
    }

    fn page_params(offset: u32, count: u32) -> ListParams {
        ListParams {
            offset: Some(offset.to_string()),
            count: Some(count.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_resolution_lifecycle_scenario() {
        let (_db, service) = seeded().await;
        let d1 = Identity::doctor("D1");
        let d2 = Identity::doctor("D2");

        let r1 = service
            .create_resolution(&d1, create_request("A1", "Lupus ruled out"))
            .await
            .unwrap();
        assert_eq!(r1.doctor_id, "D1");
        assert!(Uuid::parse_str(&r1.id).is_ok());

        let err = service
            .create_resolution(&d1, create_request("A1", "Again"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::DuplicateResolution(_)));

        let err = service
            .update_resolution(&d2, &r1.id, update_request("Mine now"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::NotOwner(_)));

        let deleted = service.delete_resolution(&d1, &r1.id).await.unwrap();
        assert_eq!(deleted, r1.id);

        let err = service
            .update_resolution(&d1, &r1.id, update_request("Resurrect"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::ResolutionNotFound(_)));
    }

    #[tokio::test]
    async fn test_round_trip_fetch_by_id() {
        let (_db, service) = seeded().await;
        let d1 = Identity::doctor("D1");

        let created = service
            .create_resolution(&d1, create_request("A1", "Sarcoidosis"))
            .await
            .unwrap();

        let fetched = service.get_resolution(&d1, &created.id).await.unwrap();
        assert_eq!(fetched.doctor_id, created.doctor_id);
        assert_eq!(fetched.appointment_id, "A1");
        assert_eq!(fetched.resolution, "Sarcoidosis");

        let by_patient = service
            .get_resolution(&Identity::patient("P1"), &created.id)
            .await
            .unwrap();
        assert_eq!(by_patient.id, created.id);

        let err = service
            .get_resolution(&Identity::patient("P2"), &created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::ResolutionNotFound(_)));
    }

    #[tokio::test]
    async fn test_non_owner_cannot_delete() {
        let (_db, service) = seeded().await;
        let created = service
            .create_resolution(&Identity::doctor("D1"), create_request("A1", "Amyloidosis"))
            .await
            .unwrap();

        let err = service
            .delete_resolution(&Identity::doctor("D2"), &created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::NotOwner(_)));

        let updated = service
            .update_resolution(&Identity::doctor("D1"), &created.id, update_request("Lupus"))
            .await
            .unwrap();
        assert_eq!(updated.resolution, "Lupus");
        assert_eq!(updated.doctor_id, "D1");
    }

    #[tokio::test]
    async fn test_create_guards() {
        let (db, service) = seeded().await;
        seed_appointment(&db, "A2", "P1", "D2", "2024-03-02T10:00:00+00:00").await;

        // Patients cannot write resolutions
        let err = service
            .create_resolution(&Identity::patient("P1"), create_request("A1", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Forbidden(_)));

        // Someone else's appointment
        let err = service
            .create_resolution(&Identity::doctor("D1"), create_request("A2", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::NotOwner(_)));

        // Unknown appointment
        let err = service
            .create_resolution(&Identity::doctor("D1"), create_request("A9", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::NotFound(_)));

        // Empty content
        let err = service
            .create_resolution(&Identity::doctor("D1"), create_request("A1", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
    }

    #[tokio::test]
    async fn test_patient_pagination_scenario() {
        let (db, service) = seeded().await;
        let d1 = Identity::doctor("D1");
        for i in 0..15 {
            let appointment = format!("PG{:02}", i);
            seed_appointment(
                &db,
                &appointment,
                "P2",
                "D1",
                &format!("2024-04-{:02}T09:00:00+00:00", i + 1),
            )
            .await;
            service
                .create_resolution(&d1, create_request(&appointment, "Follow up"))
                .await
                .unwrap();
        }

        let p2 = Identity::patient("P2");
        let first = service
            .get_resolutions_for_patient(&p2, &page_params(0, 10))
            .await
            .unwrap();
        assert_eq!(first.resolutions.len(), 10);
        assert_eq!(first.total, 15);

        let second = service
            .get_resolutions_for_patient(&p2, &page_params(10, 10))
            .await
            .unwrap();
        assert_eq!(second.resolutions.len(), 5);
        assert_eq!(second.total, 15);

        let past_end = service
            .get_resolutions_for_patient(&p2, &page_params(30, 10))
            .await
            .unwrap();
        assert!(past_end.resolutions.is_empty());
        assert_eq!(past_end.total, 15);

        // Subject comes from the identity: P1 sees none of P2's rows
        let other = service
            .get_resolutions_for_patient(&Identity::patient("P1"), &page_params(0, 10))
            .await
            .unwrap();
        assert_eq!(other.total, 0);

        let other_past_end = service
            .get_resolutions_for_patient(&Identity::patient("P1"), &page_params(30, 10))
            .await
            .unwrap();
        assert_eq!(other_past_end, ResolutionPage { resolutions: vec![], total: 0 });
    }

    #[tokio::test]
    async fn test_empty_lists_return_zero_total() {
        let (_db, service) = seeded().await;
        let params = ListParams {
            date: Some("2024-01-01".to_string()),
            ..Default::default()
        };

        let page = service
            .get_resolutions_for_doctor(&Identity::doctor("D2"), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page, ResolutionPage { resolutions: vec![], total: 0 });

        let page = service
            .get_patient_resolutions_by_date(&Identity::patient("P1"), &params)
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.resolutions.is_empty());
    }

    #[tokio::test]
    async fn test_doctor_list_with_date_and_role_scoping() {
        let (db, service) = seeded().await;
        seed_appointment(&db, "A2", "P2", "D1", "2024-03-05T10:00:00+00:00").await;
        let d1 = Identity::doctor("D1");
        service
            .create_resolution(&d1, create_request("A1", "One"))
            .await
            .unwrap();
        service
            .create_resolution(&d1, create_request("A2", "Two"))
            .await
            .unwrap();

        let all = service
            .get_resolutions_for_doctor(&d1, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);

        let params = ListParams {
            date: Some("2024-03-05".to_string()),
            ..Default::default()
        };
        let on_date = service.get_resolutions_for_doctor(&d1, &params).await.unwrap();
        assert_eq!(on_date.total, 1);
        assert_eq!(on_date.resolutions[0].appointment_id, "A2");

        let sorted = service
            .get_resolutions_for_doctor(
                &d1,
                &ListParams {
                    sort: Some("name".to_string()),
                    variant: Some("asc".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let patients: Vec<_> = sorted
            .resolutions
            .iter()
            .map(|r| r.patient_name.as_str())
            .collect();
        assert_eq!(patients, vec!["Jane Doe", "John Roe"]);

        let err = service
            .get_resolutions_for_doctor(&Identity::patient("P1"), &ListParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_list_by_specialization() {
        let (db, service) = seeded().await;
        seed_specialization(&db, "S1", "Diagnostics", &["D1"]).await;
        seed_specialization(&db, "S2", "Oncology", &["D2"]).await;
        seed_appointment(&db, "A2", "P1", "D2", "2024-03-02T10:00:00+00:00").await;

        service
            .create_resolution(&Identity::doctor("D1"), create_request("A1", "Diagnostics"))
            .await
            .unwrap();
        service
            .create_resolution(&Identity::doctor("D2"), create_request("A2", "Oncology"))
            .await
            .unwrap();

        let p1 = Identity::patient("P1");
        let page = service
            .get_patient_resolutions_by_doctor_specialization_id(&p1, "S2", &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.resolutions[0].doctor_id, "D2");

        let err = service
            .get_patient_resolutions_by_doctor_specialization_id(
                &p1,
                "S9",
                &ListParams::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_by_date_requires_valid_date() {
        let (_db, service) = seeded().await;
        let p1 = Identity::patient("P1");

        let err = service
            .get_patient_resolutions_by_date(&p1, &ListParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));

        let params = ListParams {
            date: Some("yesterday".to_string()),
            ..Default::default()
        };
        let err = service
            .get_patient_resolutions_by_date(&p1, &params)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
    }

    #[tokio::test]
    async fn test_invalid_sort_falls_back() {
        let (_db, service) = seeded().await;
        service
            .create_resolution(&Identity::doctor("D1"), create_request("A1", "x"))
            .await
            .unwrap();

        let params = ListParams {
            sort: Some("1; DROP TABLE resolution".to_string()),
            variant: Some("upwards".to_string()),
            ..Default::default()
        };
        let page = service
            .get_resolutions_for_patient(&Identity::patient("P1"), &params)
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }
}
