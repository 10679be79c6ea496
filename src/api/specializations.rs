/// Specialization reference data endpoints
use crate::{
    context::AppContext,
    error::RequestResult,
    specialization::Specialization,
};
use axum::{extract::State, http::StatusCode, routing::get, Router};

/// Build specialization routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/specializations", get(get_all_specializations))
}

/// List all doctor specializations
async fn get_all_specializations(
    State(ctx): State<AppContext>,
) -> RequestResult<Vec<Specialization>> {
    let result = ctx.specializations.get_all_specializations().await;
    RequestResult::from_result(result, StatusCode::OK)
}
