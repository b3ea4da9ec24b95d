//! # Clinic Core
//!
//! Domain entities, repository and integration ports, and the subscription
//! reconciliation and automation services.

pub mod domain;
pub mod error;
pub mod integrations;
pub mod repositories;
pub mod services;

pub use domain::*;
pub use error::DomainError;
