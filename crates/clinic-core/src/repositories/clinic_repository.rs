//! Clinic repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Clinic;
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClinicRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Clinic>, DomainError>;
    /// Exact, case-sensitive match.
    async fn find_by_email(&self, email: &str) -> Result<Option<Clinic>, DomainError>;
    async fn find_by_crm_contact_id(&self, contact_id: &str) -> Result<Option<Clinic>, DomainError>;
    async fn list(&self) -> Result<Vec<Clinic>, DomainError>;
    async fn create(&self, clinic: &Clinic) -> Result<Clinic, DomainError>;
    async fn update(&self, clinic: &Clinic) -> Result<Clinic, DomainError>;
    /// Deleting a missing clinic succeeds.
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
}
