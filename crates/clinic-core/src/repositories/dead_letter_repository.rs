//! Dead-letter store for compensation steps that failed.

use async_trait::async_trait;

use crate::domain::CompensationFailure;
use crate::error::DomainError;

#[async_trait]
pub trait DeadLetterRepository: Send + Sync {
    async fn record(&self, failure: &CompensationFailure) -> Result<(), DomainError>;
    async fn list(&self) -> Result<Vec<CompensationFailure>, DomainError>;
}
