//! # Clinic Core - Domain Module
//!
//! Domain entities for the clinic platform.

pub mod clinic;
pub mod compensation;
pub mod event;
pub mod subscription;
pub mod user;

pub use clinic::Clinic;
pub use compensation::CompensationFailure;
pub use event::CanonicalEvent;
pub use subscription::{SubscriptionHistory, SubscriptionProvider, SubscriptionTier};
pub use user::{User, UserRole};
