/// API routes and handlers
pub mod resolutions;
pub mod specializations;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(resolutions::routes())
        .merge(specializations::routes())
}
