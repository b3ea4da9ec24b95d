// ============================================================================
// Clinic Core - Registration Orchestrator
// File: crates/clinic-core/src/services/registration_service.rs
// Description: Multi-step clinic provisioning with reverse-order compensation
// ============================================================================
//! Steps, in order: validate, clinic, inactive subscription row, clinic admin,
//! coaches, payment link. Every created entity is recorded; on failure they
//! are deleted newest first. A single coach that cannot be created is skipped,
//! but every coach that was created takes part in the rollback.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use clinic_security::PasswordService;
use clinic_shared::config::PlanSettings;
use clinic_shared::constants::TEMPORARY_PASSWORD_LENGTH;
use clinic_shared::utils::mask_email;

use crate::domain::{Clinic, CompensationFailure, SubscriptionTier, User, UserRole};
use crate::error::DomainError;
use crate::integrations::{EmailKind, Mailer};
use crate::repositories::Repositories;

const FLOW: &str = "clinic_registration";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClinicRegistration {
    pub clinic_name: String,
    #[validate(email(message = "Clinic email is invalid"))]
    pub clinic_email: String,
    pub clinic_phone: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub primary_contact: String,
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub hipaa_acknowledgment: bool,
    #[serde(default)]
    pub legal_acknowledgment: bool,
    pub selected_plan: String,
    #[serde(default)]
    pub additional_coaches: Vec<CoachInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoachInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedCoach {
    pub email: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub clinic_id: Uuid,
    pub admin_user_id: Uuid,
    pub payment_link: String,
    pub coaches_created: Vec<String>,
    pub coaches_skipped: Vec<SkippedCoach>,
}

#[derive(Debug, Clone, Copy)]
enum Created {
    Clinic(Uuid),
    Subscription(Uuid),
    User(Uuid),
}

impl Created {
    fn kind(&self) -> &'static str {
        match self {
            Created::Clinic(_) => "clinic",
            Created::Subscription(_) => "subscription",
            Created::User(_) => "user",
        }
    }

    fn id(&self) -> Uuid {
        match self {
            Created::Clinic(id) | Created::Subscription(id) | Created::User(id) => *id,
        }
    }
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub struct RegistrationService {
    repos: Repositories,
    mailer: Arc<dyn Mailer>,
    plans: Vec<PlanSettings>,
    login_url: String,
}

impl RegistrationService {
    pub fn new(repos: Repositories, mailer: Arc<dyn Mailer>, plans: Vec<PlanSettings>, login_url: String) -> Self {
        Self {
            repos,
            mailer,
            plans,
            login_url,
        }
    }

    pub async fn register(&self, input: ClinicRegistration) -> Result<RegistrationResult, DomainError> {
        info!(email = %mask_email(&input.email), plan = %input.selected_plan, "Clinic registration attempt");

        // 1. Validate; nothing is written before this passes
        let password_hash = self.validate(&input).await?;

        let mut created: Vec<Created> = Vec::new();
        match self.provision(&input, password_hash, &mut created).await {
            Ok(result) => {
                info!(clinic_id = %result.clinic_id, coaches = result.coaches_created.len(), "Clinic registration completed");
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, steps = created.len(), "Clinic registration failed, rolling back");
                self.compensate(&created).await;
                Err(e)
            }
        }
    }

    async fn validate(&self, input: &ClinicRegistration) -> Result<String, DomainError> {
        let required = [
            &input.clinic_name,
            &input.clinic_email,
            &input.clinic_phone,
            &input.street_address,
            &input.city,
            &input.state,
            &input.zip_code,
            &input.primary_contact,
            &input.email,
            &input.password,
            &input.confirm_password,
            &input.selected_plan,
        ];
        if required.iter().any(|v| blank(v)) || !input.hipaa_acknowledgment || !input.legal_acknowledgment {
            return Err(DomainError::ValidationError("Missing required fields".into()));
        }
        input.validate()?;

        if input.password != input.confirm_password {
            return Err(DomainError::ValidationError("Passwords do not match".into()));
        }
        PasswordService::check_strength(
            &input.password,
            &[input.email.as_str(), input.clinic_name.as_str(), input.primary_contact.as_str()],
        )?;

        if self.repos.clinics.find_by_email(input.clinic_email.trim()).await?.is_some() {
            warn!(email = %mask_email(&input.clinic_email), "Registration rejected, clinic email already registered");
            return Err(DomainError::ClinicAlreadyExists(input.clinic_email.trim().to_string()));
        }
        if self.repos.users.find_by_email(input.email.trim()).await?.is_some() {
            warn!(email = %mask_email(&input.email), "Registration rejected, email already exists");
            return Err(DomainError::EmailAlreadyExists(input.email.trim().to_string()));
        }

        Ok(PasswordService::hash(&input.password)?)
    }

    async fn provision(
        &self,
        input: &ClinicRegistration,
        password_hash: String,
        created: &mut Vec<Created>,
    ) -> Result<RegistrationResult, DomainError> {
        // 2. Clinic
        let mut clinic = Clinic::new(&input.clinic_name, &input.clinic_email)?;
        clinic.phone = Some(input.clinic_phone.trim().to_string());
        clinic.primary_contact = Some(input.primary_contact.trim().to_string());
        clinic.street_address = Some(input.street_address.trim().to_string());
        clinic.city = Some(input.city.trim().to_string());
        clinic.state = Some(input.state.trim().to_string());
        clinic.zip_code = Some(input.zip_code.trim().to_string());
        let clinic = self.repos.clinics.create(&clinic).await?;
        created.push(Created::Clinic(clinic.id));
        info!(clinic_id = %clinic.id, "Registration: clinic created");

        // 3. Inactive subscription placeholder
        let tier = SubscriptionTier::inactive(clinic.id, input.selected_plan.trim(), Utc::now());
        let tier = self.repos.subscriptions.insert(&tier).await?;
        created.push(Created::Subscription(tier.id));
        info!(clinic_id = %clinic.id, subscription = %tier.id, "Registration: subscription placeholder created");

        // 4. Clinic admin
        let admin = User::new(
            &input.primary_contact,
            &input.email,
            Some(input.clinic_phone.trim().to_string()),
            UserRole::ClinicAdmin,
            password_hash,
            Some(clinic.id),
        )?;
        let admin = self.repos.users.create(&admin).await?;
        created.push(Created::User(admin.id));
        info!(clinic_id = %clinic.id, user_id = %admin.id, "Registration: clinic admin created");

        // 5. Coaches, each isolated
        let mut coaches_created = Vec::new();
        let mut coaches_skipped = Vec::new();
        for coach in &input.additional_coaches {
            let (Some(name), Some(email), Some(phone)) =
                (non_blank(&coach.name), non_blank(&coach.email), non_blank(&coach.phone))
            else {
                coaches_skipped.push(SkippedCoach {
                    email: coach.email.clone(),
                    reason: "Coach name, email and phone are required".into(),
                });
                continue;
            };
            match self.create_coach(&clinic, name, email, phone).await {
                Ok(user) => {
                    created.push(Created::User(user.id));
                    coaches_created.push(user.email);
                }
                Err(e) => {
                    warn!(email = %mask_email(email), error = %e, "Registration: coach skipped");
                    coaches_skipped.push(SkippedCoach {
                        email: Some(email.to_string()),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // 6. Payment link for the chosen plan
        let payment_link = self
            .plans
            .iter()
            .find(|p| p.id == input.selected_plan.trim())
            .and_then(|p| p.payment_link.clone())
            .filter(|link| !link.is_empty())
            .ok_or_else(|| DomainError::PlanNotConfigured(input.selected_plan.clone()))?;

        Ok(RegistrationResult {
            clinic_id: clinic.id,
            admin_user_id: admin.id,
            payment_link,
            coaches_created,
            coaches_skipped,
        })
    }

    /// Credentials are mailed before the account exists; a mail failure skips the coach.
    async fn create_coach(&self, clinic: &Clinic, name: &str, email: &str, phone: &str) -> Result<User, DomainError> {
        let temporary_password = PasswordService::generate_temporary(TEMPORARY_PASSWORD_LENGTH);
        let password_hash = PasswordService::hash(&temporary_password)?;
        let user = User::new(
            name,
            email,
            Some(phone.to_string()),
            UserRole::Coach,
            password_hash,
            Some(clinic.id),
        )?;

        self.mailer
            .send_template(
                email,
                EmailKind::CoachCredentials,
                json!({
                    "name": name,
                    "email": email,
                    "password": temporary_password,
                    "clinic_name": clinic.name,
                    "login_url": self.login_url,
                }),
            )
            .await?;

        self.repos.users.create(&user).await
    }

    async fn compensate(&self, created: &[Created]) {
        for step in created.iter().rev() {
            let result = match step {
                Created::User(id) => self.repos.users.delete(id).await,
                Created::Subscription(id) => self.repos.subscriptions.delete(id).await,
                Created::Clinic(id) => self.repos.clinics.delete(id).await,
            };
            match result {
                Ok(()) => info!(entity = step.kind(), id = %step.id(), "Rollback: deleted"),
                Err(e) => {
                    error!(entity = step.kind(), id = %step.id(), error = %e, "Rollback step failed");
                    let failure = CompensationFailure::new(FLOW, step.kind(), step.id(), e.to_string());
                    if let Err(record_err) = self.repos.dead_letters.record(&failure).await {
                        error!(entity = step.kind(), id = %step.id(), error = %record_err, "Could not record rollback failure");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::{MailError, MockMailer};
    use crate::repositories::{
        ClinicRepository, DeadLetterRepository, InMemoryStore, MockUserRepository, SubscriptionRepository,
        UserRepository,
    };

    fn plans(link: Option<&str>) -> Vec<PlanSettings> {
        vec![PlanSettings {
            id: "basic_plan".into(),
            name: "Basic Plan".into(),
            price: 99.0,
            payment_link: link.map(String::from),
            crm_product_id: None,
            crm_price_id: None,
        }]
    }

    fn input() -> ClinicRegistration {
        ClinicRegistration {
            clinic_name: "Sunrise Wellness".into(),
            clinic_email: "front@sunrise.test".into(),
            clinic_phone: "555-0100".into(),
            street_address: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip_code: "62701".into(),
            primary_contact: "Dana Reyes".into(),
            email: "dana@sunrise.test".into(),
            password: "Tangerine-Violin-Orbit-77".into(),
            confirm_password: "Tangerine-Violin-Orbit-77".into(),
            hipaa_acknowledgment: true,
            legal_acknowledgment: true,
            selected_plan: "basic_plan".into(),
            additional_coaches: vec![
                CoachInput {
                    name: Some("Coach One".into()),
                    email: Some("one@sunrise.test".into()),
                    phone: Some("555-0101".into()),
                },
                CoachInput {
                    name: Some("No Phone".into()),
                    email: Some("nophone@sunrise.test".into()),
                    phone: None,
                },
            ],
        }
    }

    fn ok_mailer() -> MockMailer {
        let mut mailer = MockMailer::new();
        mailer.expect_send_template().returning(|_, _, _| Ok(()));
        mailer
    }

    #[tokio::test]
    async fn test_successful_registration() {
        let store = Arc::new(InMemoryStore::new());
        let svc = RegistrationService::new(
            Repositories::from_store(store.clone()),
            Arc::new(ok_mailer()),
            plans(Some("https://pay.example/basic")),
            "/login".into(),
        );
        let result = svc.register(input()).await.unwrap();

        assert_eq!(result.payment_link, "https://pay.example/basic");
        assert_eq!(result.coaches_created, vec!["one@sunrise.test".to_string()]);
        assert_eq!(result.coaches_skipped.len(), 1);

        let tier = store.find_latest_by_clinic(&result.clinic_id).await.unwrap().unwrap();
        assert!(!tier.is_active);
        assert_eq!(UserRepository::list_by_clinic(store.as_ref(), &result.clinic_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_validation_failures_have_no_side_effects() {
        let store = Arc::new(InMemoryStore::new());
        let svc = RegistrationService::new(
            Repositories::from_store(store.clone()),
            Arc::new(MockMailer::new()),
            plans(Some("https://pay.example/basic")),
            "/login".into(),
        );

        let mut mismatch = input();
        mismatch.confirm_password = "something-else".into();
        assert!(matches!(svc.register(mismatch).await, Err(DomainError::ValidationError(_))));

        let mut missing = input();
        missing.zip_code = "  ".into();
        assert!(matches!(svc.register(missing).await, Err(DomainError::ValidationError(_))));

        let mut unacknowledged = input();
        unacknowledged.hipaa_acknowledgment = false;
        assert!(svc.register(unacknowledged).await.is_err());

        let mut weak = input();
        weak.password = "password".into();
        weak.confirm_password = "password".into();
        assert!(matches!(svc.register(weak).await, Err(DomainError::PasswordTooWeak)));

        assert!(ClinicRepository::list(store.as_ref()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registered_clinic_email_is_rejected_before_writes() {
        let store = Arc::new(InMemoryStore::new());
        let existing = Clinic::new("Sunrise", "front@sunrise.test").unwrap();
        ClinicRepository::create(store.as_ref(), &existing).await.unwrap();
        let svc = RegistrationService::new(
            Repositories::from_store(store.clone()),
            Arc::new(MockMailer::new()),
            plans(Some("https://pay.example/basic")),
            "/login".into(),
        );

        let err = svc.register(input()).await.unwrap_err();
        assert!(matches!(err, DomainError::ClinicAlreadyExists(_)));
        assert_eq!(ClinicRepository::list(store.as_ref()).await.unwrap().len(), 1);
        assert!(UserRepository::find_by_email(store.as_ref(), "dana@sunrise.test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_payment_link_rolls_back_everything() {
        let store = Arc::new(InMemoryStore::new());
        let svc = RegistrationService::new(
            Repositories::from_store(store.clone()),
            Arc::new(ok_mailer()),
            plans(None),
            "/login".into(),
        );
        let err = svc.register(input()).await.unwrap_err();
        assert!(matches!(err, DomainError::PlanNotConfigured(_)));

        assert!(ClinicRepository::list(store.as_ref()).await.unwrap().is_empty());
        assert!(SubscriptionRepository::list(store.as_ref()).await.unwrap().is_empty());
        assert!(UserRepository::find_by_email(store.as_ref(), "dana@sunrise.test").await.unwrap().is_none());
        assert!(UserRepository::find_by_email(store.as_ref(), "one@sunrise.test").await.unwrap().is_none());
        assert!(DeadLetterRepository::list(store.as_ref()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_coach_mail_failure_skips_only_that_coach() {
        let store = Arc::new(InMemoryStore::new());
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_template()
            .returning(|_, _, _| Err(MailError::Delivery("mailbox full".into())));
        let svc = RegistrationService::new(
            Repositories::from_store(store.clone()),
            Arc::new(mailer),
            plans(Some("https://pay.example/basic")),
            "/login".into(),
        );
        let result = svc.register(input()).await.unwrap();
        assert!(result.coaches_created.is_empty());
        assert_eq!(result.coaches_skipped.len(), 2);
        assert!(UserRepository::find_by_email(store.as_ref(), "one@sunrise.test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_rollback_step_is_dead_lettered() {
        let store = Arc::new(InMemoryStore::new());
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        users.expect_create().returning(|u| Ok(u.clone()));
        users
            .expect_delete()
            .returning(|_| Err(DomainError::DatabaseError("connection lost".into())));

        let mut repos = Repositories::from_store(store.clone());
        repos.users = Arc::new(users);
        let svc = RegistrationService::new(repos, Arc::new(ok_mailer()), plans(None), "/login".into());

        assert!(svc.register(input()).await.is_err());
        let dead = DeadLetterRepository::list(store.as_ref()).await.unwrap();
        // admin and one coach could not be removed; clinic and subscription were
        assert_eq!(dead.len(), 2);
        assert!(dead.iter().all(|d| d.entity_kind == "user" && d.flow == FLOW));
        assert!(ClinicRepository::list(store.as_ref()).await.unwrap().is_empty());
    }
}
