/// Resolution endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::{ClinicError, RequestResult},
    resolution::{
        CreateResolutionRequest, DeletedResolution, ListParams, Resolution, ResolutionPage,
        UpdateResolutionRequest,
    },
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};

/// Build resolution routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/resolutions", post(create_resolution))
        .route("/api/resolutions/me", get(get_resolutions_for_patient))
        .route("/api/resolutions/doctor/me", get(get_resolutions_for_doctor))
        .route(
            "/api/resolutions/doctor/specialization/:specialization_id",
            get(get_patient_resolutions_by_doctor_specialization_id),
        )
        .route("/api/resolutions/date", get(get_patient_resolutions_by_date))
        .route(
            "/api/resolutions/:id",
            get(get_resolution)
                .patch(update_resolution)
                .delete(delete_resolution),
        )
}

async fn create_resolution(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    payload: Result<Json<CreateResolutionRequest>, JsonRejection>,
) -> RequestResult<Resolution> {
    match payload {
        Ok(Json(req)) => ctx.resolutions.create_resolution(&auth.identity, req).await,
        Err(rejection) => ClinicError::from(rejection).into(),
    }
}

async fn get_resolution(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> RequestResult<Resolution> {
    ctx.resolutions.get_resolution(&auth.identity, &id).await
}

async fn update_resolution(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    payload: Result<Json<UpdateResolutionRequest>, JsonRejection>,
) -> RequestResult<Resolution> {
    match payload {
        Ok(Json(req)) => {
            ctx.resolutions
                .update_resolution(&auth.identity, &id, req)
                .await
        }
        Err(rejection) => ClinicError::from(rejection).into(),
    }
}

async fn delete_resolution(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> RequestResult<DeletedResolution> {
    ctx.resolutions.delete_resolution(&auth.identity, &id).await
}

async fn get_resolutions_for_patient(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(params): Query<ListParams>,
) -> RequestResult<ResolutionPage> {
    ctx.resolutions
        .get_resolutions_for_patient(&auth.identity, &params)
        .await
}

async fn get_resolutions_for_doctor(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(params): Query<ListParams>,
) -> RequestResult<ResolutionPage> {
    ctx.resolutions
        .get_resolutions_for_doctor(&auth.identity, &params)
        .await
}

async fn get_patient_resolutions_by_doctor_specialization_id(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(specialization_id): Path<String>,
    Query(params): Query<ListParams>,
) -> RequestResult<ResolutionPage> {
    ctx.resolutions
        .get_patient_resolutions_by_doctor_specialization_id(
            &auth.identity,
            &specialization_id,
            &params,
        )
        .await
}

async fn get_patient_resolutions_by_date(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(params): Query<ListParams>,
) -> RequestResult<ResolutionPage> {
    ctx.resolutions
        .get_patient_resolutions_by_date(&auth.identity, &params)
        .await
}
