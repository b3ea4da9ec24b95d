// ============================================================================
// Clinic Core - In-Memory Store
// File: crates/clinic-core/src/repositories/memory.rs
// Description: Process-local adapter for every repository port. Backs the
//              `memory://` database url and the service tests.
// ============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ClinicRepository, DeadLetterRepository, StoreHealth, SubscriptionRepository, UserRepository};
use crate::domain::{Clinic, CompensationFailure, SubscriptionHistory, SubscriptionTier, User};
use crate::error::DomainError;

#[derive(Default)]
pub struct InMemoryStore {
    clinics: RwLock<HashMap<Uuid, Clinic>>,
    users: RwLock<HashMap<Uuid, User>>,
    subscriptions: RwLock<HashMap<Uuid, SubscriptionTier>>,
    history: RwLock<Vec<SubscriptionHistory>>,
    dead_letters: RwLock<Vec<CompensationFailure>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[async_trait]
impl ClinicRepository for InMemoryStore {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Clinic>, DomainError> {
        Ok(self.clinics.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Clinic>, DomainError> {
        Ok(self
            .clinics
            .read()
            .await
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn find_by_crm_contact_id(&self, contact_id: &str) -> Result<Option<Clinic>, DomainError> {
        Ok(self
            .clinics
            .read()
            .await
            .values()
            .find(|c| c.crm_contact_id.as_deref() == Some(contact_id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Clinic>, DomainError> {
        let mut clinics: Vec<Clinic> = self.clinics.read().await.values().cloned().collect();
        clinics.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(clinics)
    }

    async fn create(&self, clinic: &Clinic) -> Result<Clinic, DomainError> {
        let mut clinics = self.clinics.write().await;
        if clinics.values().any(|c| c.email == clinic.email) {
            return Err(DomainError::ClinicAlreadyExists(clinic.email.clone()));
        }
        clinics.insert(clinic.id, clinic.clone());
        Ok(clinic.clone())
    }

    async fn update(&self, clinic: &Clinic) -> Result<Clinic, DomainError> {
        let mut clinics = self.clinics.write().await;
        match clinics.get_mut(&clinic.id) {
            Some(existing) => {
                *existing = clinic.clone();
                Ok(clinic.clone())
            }
            None => Err(DomainError::ClinicNotFound),
        }
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        self.clinics.write().await.remove(id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_by_clinic(&self, clinic_id: &Uuid) -> Result<Vec<User>, DomainError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.clinic_id.as_ref() == Some(clinic_id))
            .cloned()
            .collect())
    }

    async fn create(&self, user: &User) -> Result<User, DomainError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(DomainError::EmailAlreadyExists(user.email.clone()));
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        self.users.write().await.remove(id);
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn find_latest_by_clinic(&self, clinic_id: &Uuid) -> Result<Option<SubscriptionTier>, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| &s.clinic_id == clinic_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<SubscriptionTier>, DomainError> {
        Ok(self.subscriptions.read().await.values().cloned().collect())
    }

    async fn insert(&self, tier: &SubscriptionTier) -> Result<SubscriptionTier, DomainError> {
        // Same check-and-insert under one write lock as the UNIQUE(clinic_id) constraint.
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions.values().any(|s| s.clinic_id == tier.clinic_id) {
            return Err(DomainError::SubscriptionAlreadyExists(tier.clinic_id));
        }
        subscriptions.insert(tier.id, tier.clone());
        Ok(tier.clone())
    }

    async fn update(&self, tier: &SubscriptionTier) -> Result<SubscriptionTier, DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        match subscriptions.get_mut(&tier.id) {
            Some(existing) => {
                *existing = tier.clone();
                Ok(tier.clone())
            }
            None => Err(DomainError::SubscriptionNotFound),
        }
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        self.subscriptions.write().await.remove(id);
        Ok(())
    }

    async fn create_history_once(&self, history: &SubscriptionHistory) -> Result<SubscriptionHistory, DomainError> {
        let mut rows = self.history.write().await;
        if let Some(existing) = rows.iter().find(|h| h.subscription_id == history.subscription_id) {
            return Ok(existing.clone());
        }
        rows.push(history.clone());
        Ok(history.clone())
    }

    async fn list_history(&self) -> Result<Vec<SubscriptionHistory>, DomainError> {
        let mut rows = self.history.read().await.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

#[async_trait]
impl DeadLetterRepository for InMemoryStore {
    async fn record(&self, failure: &CompensationFailure) -> Result<(), DomainError> {
        self.dead_letters.write().await.push(failure.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CompensationFailure>, DomainError> {
        Ok(self.dead_letters.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_second_insert_for_clinic_conflicts() {
        let store = InMemoryStore::new();
        let clinic_id = Uuid::new_v4();
        let now = Utc::now();
        store.insert(&SubscriptionTier::inactive(clinic_id, "basic_plan", now)).await.unwrap();
        let err = store
            .insert(&SubscriptionTier::inactive(clinic_id, "premium_plan", now))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::SubscriptionAlreadyExists(id) if id == clinic_id));
    }

    #[tokio::test]
    async fn test_clinic_email_is_unique() {
        let store = InMemoryStore::new();
        let first = Clinic::new("Sunrise", "front@sunrise.test").unwrap();
        ClinicRepository::create(&store, &first).await.unwrap();
        let second = Clinic::new("Sunrise Again", "front@sunrise.test").unwrap();
        let err = ClinicRepository::create(&store, &second).await.unwrap_err();
        assert!(matches!(err, DomainError::ClinicAlreadyExists(_)));
        assert_eq!(ClinicRepository::list(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_write_once_per_subscription() {
        let store = InMemoryStore::new();
        let (clinic_id, sub_id) = (Uuid::new_v4(), Uuid::new_v4());
        let first = store
            .create_history_once(&SubscriptionHistory::new(clinic_id, sub_id, 99.0, Utc::now()))
            .await
            .unwrap();
        let second = store
            .create_history_once(&SubscriptionHistory::new(clinic_id, sub_id, 199.0, Utc::now()))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list_history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deletes_are_idempotent() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        assert!(ClinicRepository::delete(&store, &id).await.is_ok());
        assert!(UserRepository::delete(&store, &id).await.is_ok());
        assert!(SubscriptionRepository::delete(&store, &id).await.is_ok());
    }
}
