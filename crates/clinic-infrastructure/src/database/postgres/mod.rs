//! PostgreSQL repository implementations

pub mod clinic_repo_impl;
pub mod dead_letter_repo_impl;
pub mod health;
pub mod subscription_repo_impl;
pub mod user_repo_impl;

pub use clinic_repo_impl::PgClinicRepository;
pub use dead_letter_repo_impl::PgDeadLetterRepository;
pub use health::PgStoreHealth;
pub use subscription_repo_impl::PgSubscriptionRepository;
pub use user_repo_impl::PgUserRepository;

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}
