//! # Clinic Infrastructure
//!
//! Adapters: PostgreSQL repositories, the CRM REST client and mail delivery.

pub mod crm;
pub mod database;
pub mod mail;

pub use crm::HttpCrmClient;
pub use database::{create_pool, postgres_repositories, run_migrations};
pub use mail::{LogMailer, SmtpMailer, TemplateRenderer};
