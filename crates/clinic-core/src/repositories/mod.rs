//! Repository traits (ports) and the in-process adapter.

pub mod clinic_repository;
pub mod dead_letter_repository;
pub mod memory;
pub mod subscription_repository;
pub mod user_repository;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DomainError;

pub use clinic_repository::ClinicRepository;
pub use dead_letter_repository::DeadLetterRepository;
pub use memory::InMemoryStore;
pub use subscription_repository::SubscriptionRepository;
pub use user_repository::UserRepository;

#[cfg(test)]
pub use clinic_repository::MockClinicRepository;
#[cfg(test)]
pub use subscription_repository::MockSubscriptionRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;

/// Liveness check for the backing store.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), DomainError>;
}

/// The set of stores a service graph is built from.
#[derive(Clone)]
pub struct Repositories {
    pub clinics: Arc<dyn ClinicRepository>,
    pub users: Arc<dyn UserRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub dead_letters: Arc<dyn DeadLetterRepository>,
    pub health: Arc<dyn StoreHealth>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()))
    }

    pub fn from_store(store: Arc<InMemoryStore>) -> Self {
        Self {
            clinics: store.clone(),
            users: store.clone(),
            subscriptions: store.clone(),
            dead_letters: store.clone(),
            health: store,
        }
    }
}
