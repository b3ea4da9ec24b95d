//! Database module (PostgreSQL adapters)

pub mod connection;
pub mod postgres;

use std::sync::Arc;

use sqlx::PgPool;

use clinic_core::repositories::Repositories;

pub use connection::{create_pool, run_migrations};
pub use postgres::{
    PgClinicRepository, PgDeadLetterRepository, PgStoreHealth, PgSubscriptionRepository, PgUserRepository,
};

pub fn postgres_repositories(pool: PgPool) -> Repositories {
    Repositories {
        clinics: Arc::new(PgClinicRepository::new(pool.clone())),
        users: Arc::new(PgUserRepository::new(pool.clone())),
        subscriptions: Arc::new(PgSubscriptionRepository::new(pool.clone())),
        dead_letters: Arc::new(PgDeadLetterRepository::new(pool.clone())),
        health: Arc::new(PgStoreHealth::new(pool)),
    }
}
