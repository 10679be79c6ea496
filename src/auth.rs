/// Authentication extractor
///
/// The bearer token is verified once, here, and handlers receive the
/// resulting `Identity`.
use crate::{context::AppContext, error::ClinicError, identity::Identity};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: Identity,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ClinicError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ClinicError::Unauthorized("Missing authorization header".to_string())
                })?;

        let identity = state.token_service.verify_token(bearer.token())?;

        Ok(AuthContext { identity })
    }
}
