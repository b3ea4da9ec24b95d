//! # Clinic Core - Services
//!
//! Webhook pipeline: [`event_normalizer`] → [`status_mapper`] →
//! [`clinic_resolver`] → [`workflow`] (which drives
//! [`subscription_reconciler`]). Registration, sessions, billing and CRM
//! migration are separate entry points.

pub mod auth_service;
pub mod billing_service;
pub mod clinic_resolver;
pub mod coercion;
pub mod crm_migration_service;
pub mod event_normalizer;
pub mod registration_service;
pub mod status_mapper;
pub mod subscription_reconciler;
pub mod webhook_service;
pub mod workflow;

pub use auth_service::{AuthService, SessionResult, SubscriptionStatus, UserInfo};
pub use billing_service::{BillingAction, BillingOutcome, BillingService, SubscriptionOverview};
pub use clinic_resolver::ClinicResolver;
pub use crm_migration_service::CrmMigrationService;
pub use registration_service::{ClinicRegistration, CoachInput, RegistrationResult, RegistrationService};
pub use status_mapper::{map_status, resolve_status, StatusResolution, SubscriptionTrigger};
pub use subscription_reconciler::{ReconcileAction, ReconcileOutcome, SubscriptionReconciler};
pub use webhook_service::{WebhookOutcome, WebhookService};
pub use workflow::{WorkflowContext, WorkflowDescription, WorkflowDispatcher, WorkflowReport};
