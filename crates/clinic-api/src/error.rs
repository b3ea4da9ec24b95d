// ============================================================================
// Clinic API - Error Mapping
// File: crates/clinic-api/src/error.rs
// ============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use clinic_core::error::DomainError;

use crate::response::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Unprocessable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE_ENTITY"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let message = e.to_string();
        match e {
            DomainError::ClinicNotFound | DomainError::UserNotFound | DomainError::SubscriptionNotFound => {
                ApiError::NotFound(message)
            }
            DomainError::InvalidCredentials | DomainError::InvalidToken(_) => ApiError::Unauthorized(message),
            DomainError::EmailAlreadyExists(_)
            | DomainError::ClinicAlreadyExists(_)
            | DomainError::SubscriptionAlreadyExists(_)
            | DomainError::SubscriptionAlreadyActive => ApiError::Conflict(message),
            DomainError::MissingExternalSubscription
            | DomainError::AlreadyOnCrm
            | DomainError::PlanNotConfigured(_)
            | DomainError::PasswordTooShort(_)
            | DomainError::PasswordTooLong(_)
            | DomainError::PasswordTooWeak
            | DomainError::ValidationError(_) => ApiError::BadRequest(message),
            DomainError::Crm(_) | DomainError::Mail(_) => ApiError::Upstream(message),
            DomainError::PasswordHashError(_)
            | DomainError::TokenGenerationError(_)
            | DomainError::DatabaseError(_)
            | DomainError::InternalError(_) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), "{}", message);
        } else {
            warn!(status = status.as_u16(), "{}", message);
        }

        // Internal details stay in the log
        let public_message = match &self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            _ => message,
        };

        (status, Json(ApiResponse::error(code, &public_message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::integrations::CrmError;

    fn status_of(e: DomainError) -> StatusCode {
        ApiError::from(e).into_response().status()
    }

    #[test]
    fn test_domain_error_mapping() {
        assert_eq!(status_of(DomainError::ClinicNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(DomainError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(DomainError::EmailAlreadyExists("a@x.com".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(DomainError::ClinicAlreadyExists("a@x.com".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(DomainError::ValidationError("bad".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(DomainError::PlanNotConfigured("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(DomainError::Crm(CrmError::request("create contact", "boom"))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(DomainError::DatabaseError("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
