/// Unified error types for the clinic records service
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ClinicError {
    /// Missing, malformed, expired or forged identity
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller has a valid identity but the wrong role for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A resolution already exists for the appointment
    #[error("Resolution for appointment {0} already exists")]
    DuplicateResolution(String),

    /// Resolution does not exist (or is not visible to the caller)
    #[error("Resolution {0} not found")]
    ResolutionNotFound(String),

    /// Caller is not the doctor who owns the resolution or appointment
    #[error("Not owner: {0}")]
    NotOwner(String),

    /// Reference data (appointment, specialization) not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT errors raised while signing
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClinicError {
    /// HTTP status this error surfaces as at the transport boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClinicError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ClinicError::Forbidden(_) | ClinicError::NotOwner(_) => StatusCode::FORBIDDEN,
            ClinicError::DuplicateResolution(_) | ClinicError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ClinicError::ResolutionNotFound(_) | ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
            ClinicError::Database(_)
            | ClinicError::Io(_)
            | ClinicError::Jwt(_)
            | ClinicError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            ClinicError::Unauthorized(_) => "Unauthorized",
            ClinicError::Forbidden(_) => "Forbidden",
            ClinicError::DuplicateResolution(_) => "DuplicateResolution",
            ClinicError::ResolutionNotFound(_) => "ResolutionNotFound",
            ClinicError::NotOwner(_) => "NotOwner",
            ClinicError::NotFound(_) => "NotFound",
            ClinicError::Validation(_) => "InvalidRequest",
            ClinicError::Database(_)
            | ClinicError::Io(_)
            | ClinicError::Jwt(_)
            | ClinicError::Internal(_) => "InternalServerError",
        }
    }

    /// Message safe to hand to a client. Server faults never leak detail.
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert ClinicError to HTTP response
impl IntoResponse for ClinicError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.error_code().to_string(),
            message: self.public_message(),
        });

        (self.status_code(), body).into_response()
    }
}

/// Unreadable or incomplete request bodies are client errors
impl From<JsonRejection> for ClinicError {
    fn from(rejection: JsonRejection) -> Self {
        ClinicError::Validation(rejection.body_text())
    }
}

/// Result type alias for service operations
pub type ClinicResult<T> = Result<T, ClinicError>;

/// Outcome of a boundary-facing operation: a status code paired with either
/// the payload or an error message.
#[derive(Debug)]
pub enum RequestResult<T> {
    Success { status: StatusCode, value: T },
    Failure { status: StatusCode, error: String, message: String },
}

impl<T> RequestResult<T> {
    /// Translate a domain result once, at the boundary
    pub fn from_result(result: ClinicResult<T>, success: StatusCode) -> Self {
        match result {
            Ok(value) => RequestResult::Success {
                status: success,
                value,
            },
            Err(err) => err.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RequestResult::Success { status, .. } | RequestResult::Failure { status, .. } => *status,
        }
    }

    /// Payload on success, `None` on failure
    #[cfg(test)]
    pub fn value(self) -> Option<T> {
        match self {
            RequestResult::Success { value, .. } => Some(value),
            RequestResult::Failure { .. } => None,
        }
    }
}

impl<T> From<ClinicError> for RequestResult<T> {
    fn from(err: ClinicError) -> Self {
        if err.status_code().is_server_error() {
            tracing::error!("Operation failed: {}", err);
        }
        RequestResult::Failure {
            status: err.status_code(),
            error: err.error_code().to_string(),
            message: err.public_message(),
        }
    }
}

impl<T: Serialize> IntoResponse for RequestResult<T> {
    fn into_response(self) -> Response {
        match self {
            RequestResult::Success { status, value } => (status, Json(value)).into_response(),
            RequestResult::Failure {
                status,
                error,
                message,
            } => (status, Json(ErrorResponse { error, message })).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_status_mapping() {
        assert_eq!(
            ClinicError::DuplicateResolution("a1".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ClinicError::ResolutionNotFound("r1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ClinicError::NotOwner("r1".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ClinicError::Unauthorized("bad token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_server_errors_do_not_leak() {
        let err = ClinicError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");

        let err = ClinicError::NotOwner("resolution r1".into());
        assert!(err.public_message().contains("resolution r1"));
    }

    #[test]
    fn test_request_result_from_error() {
        let result: RequestResult<u32> =
            RequestResult::from_result(Err(ClinicError::NotOwner("r1".into())), StatusCode::OK);
        assert_eq!(result.status(), StatusCode::FORBIDDEN);
        assert!(matches!(result, RequestResult::Failure { .. }));
        assert!(result.value().is_none());

        let result = RequestResult::from_result(Ok(7u32), StatusCode::CREATED);
        assert_eq!(result.status(), StatusCode::CREATED);
        assert_eq!(result.value(), Some(7));
    }
}
