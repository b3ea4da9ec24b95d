//! Domain errors

use thiserror::Error;
use uuid::Uuid;

use crate::integrations::{CrmError, MailError};

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("A clinic already uses email {0}")]
    ClinicAlreadyExists(String),

    #[error("Subscription already exists for clinic {0}")]
    SubscriptionAlreadyExists(Uuid),

    #[error("Subscription is already active")]
    SubscriptionAlreadyActive,

    #[error("No external subscription id on record")]
    MissingExternalSubscription,

    #[error("Clinic is already billed through the CRM")]
    AlreadyOnCrm,

    #[error("Plan not configured: {0}")]
    PlanNotConfigured(String),

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Password must be at most {0} characters")]
    PasswordTooLong(usize),

    #[error("Password too weak")]
    PasswordTooWeak,

    #[error("Password hash error: {0}")]
    PasswordHashError(String),

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Crm(#[from] CrmError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(e: validator::ValidationErrors) -> Self {
        DomainError::ValidationError(e.to_string())
    }
}

impl From<clinic_security::password::PasswordError> for DomainError {
    fn from(e: clinic_security::password::PasswordError) -> Self {
        use clinic_security::password::PasswordError;
        match e {
            PasswordError::TooShort(n) => DomainError::PasswordTooShort(n),
            PasswordError::TooLong(n) => DomainError::PasswordTooLong(n),
            PasswordError::TooWeak => DomainError::PasswordTooWeak,
            PasswordError::HashError(msg) => DomainError::PasswordHashError(msg),
        }
    }
}
