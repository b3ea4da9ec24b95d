// ============================================================================
// Clinic API - Application State
// File: crates/clinic-api/src/state.rs
// ============================================================================

use std::sync::Arc;

use clinic_core::integrations::{CrmClient, Mailer};
use clinic_core::repositories::Repositories;
use clinic_core::services::{
    AuthService, BillingService, ClinicResolver, CrmMigrationService, RegistrationService, SubscriptionReconciler,
    WebhookService, WorkflowDispatcher,
};
use clinic_security::JwtService;
use clinic_shared::config::AppConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repos: Repositories,
    pub auth: Arc<AuthService>,
    pub registration: Arc<RegistrationService>,
    pub webhooks: Arc<WebhookService>,
    pub billing: Arc<BillingService>,
    pub migration: Arc<CrmMigrationService>,
}

impl AppState {
    /// Wires the service graph over the chosen stores and integrations.
    pub fn new(config: AppConfig, repos: Repositories, mailer: Arc<dyn Mailer>, crm: Arc<dyn CrmClient>) -> Self {
        let jwt = Arc::new(JwtService::new(config.jwt.secret.clone(), config.jwt.session_ttl_secs));
        let login_url = format!("{}/login", config.app.public_base_url.trim_end_matches('/'));

        let reconciler = Arc::new(SubscriptionReconciler::new(repos.subscriptions.clone()));
        let dispatcher = Arc::new(WorkflowDispatcher::new(reconciler, mailer.clone(), crm.clone()));
        let resolver = Arc::new(ClinicResolver::new(repos.clinics.clone()));
        let webhooks = Arc::new(WebhookService::new(resolver, dispatcher, config.webhook.unknown_status));

        let auth = Arc::new(AuthService::new(repos.users.clone(), repos.subscriptions.clone(), jwt));
        let registration = Arc::new(RegistrationService::new(
            repos.clone(),
            mailer,
            config.plans.clone(),
            login_url,
        ));
        let billing = Arc::new(BillingService::new(
            repos.clinics.clone(),
            repos.subscriptions.clone(),
            crm,
            config.plans.clone(),
            config.crm.dashboard_url.clone(),
        ));
        let migration = Arc::new(CrmMigrationService::new(
            repos.clinics.clone(),
            repos.subscriptions.clone(),
            billing.clone(),
        ));

        Self {
            config: Arc::new(config),
            repos,
            auth,
            registration,
            webhooks,
            billing,
            migration,
        }
    }
}
