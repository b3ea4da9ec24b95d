//! User repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::User;
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    async fn list_by_clinic(&self, clinic_id: &Uuid) -> Result<Vec<User>, DomainError>;
    /// Fails with `EmailAlreadyExists` on a duplicate email.
    async fn create(&self, user: &User) -> Result<User, DomainError>;
    /// Deleting a missing user succeeds.
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
}
