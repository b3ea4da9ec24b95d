// ============================================================================
// Clinic Core - Subscription Repository
// File: crates/clinic-core/src/repositories/subscription_repository.rs
// ============================================================================
//! Subscription and payment-ledger repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{SubscriptionHistory, SubscriptionTier};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Most recently created row for the clinic.
    async fn find_latest_by_clinic(&self, clinic_id: &Uuid) -> Result<Option<SubscriptionTier>, DomainError>;
    async fn list(&self) -> Result<Vec<SubscriptionTier>, DomainError>;
    /// Fails with `SubscriptionAlreadyExists` when the clinic already has a row.
    async fn insert(&self, tier: &SubscriptionTier) -> Result<SubscriptionTier, DomainError>;
    async fn update(&self, tier: &SubscriptionTier) -> Result<SubscriptionTier, DomainError>;
    /// Deleting a missing row succeeds.
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;

    /// Returns the existing ledger row for `history.subscription_id` if there
    /// is one, otherwise stores and returns `history`.
    async fn create_history_once(&self, history: &SubscriptionHistory) -> Result<SubscriptionHistory, DomainError>;
    /// Newest first.
    async fn list_history(&self) -> Result<Vec<SubscriptionHistory>, DomainError>;
}
