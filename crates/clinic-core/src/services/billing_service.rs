// ============================================================================
// Clinic Core - Billing Service
// File: crates/clinic-core/src/services/billing_service.rs
// Description: Clinic-initiated subscription management through the CRM
// ============================================================================

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use clinic_shared::config::PlanSettings;
use clinic_shared::utils::split_name;

use crate::domain::{Clinic, SubscriptionProvider, SubscriptionTier};
use crate::error::DomainError;
use crate::integrations::{CrmClient, CrmContact, CrmSubscription, NewCrmContact};
use crate::repositories::{ClinicRepository, SubscriptionRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingAction {
    Create,
    Update,
    Cancel,
}

impl BillingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingAction::Create => "create",
            BillingAction::Update => "update",
            BillingAction::Cancel => "cancel",
        }
    }
}

impl FromStr for BillingAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(BillingAction::Create),
            "update" => Ok(BillingAction::Update),
            "cancel" => Ok(BillingAction::Cancel),
            _ => Err(DomainError::ValidationError("Invalid action".into())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOverview {
    pub subscription: Option<SubscriptionTier>,
    /// `None` when there is no external id or the CRM could not be reached.
    pub crm_details: Option<CrmSubscription>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingOutcome {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    pub subscription: Option<SubscriptionTier>,
}

pub struct BillingService {
    clinics: Arc<dyn ClinicRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    crm: Arc<dyn CrmClient>,
    plans: Vec<PlanSettings>,
    dashboard_url: String,
}

impl BillingService {
    pub fn new(
        clinics: Arc<dyn ClinicRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        crm: Arc<dyn CrmClient>,
        plans: Vec<PlanSettings>,
        dashboard_url: String,
    ) -> Self {
        Self {
            clinics,
            subscriptions,
            crm,
            plans,
            dashboard_url,
        }
    }

    pub fn plan(&self, plan_id: &str) -> Option<&PlanSettings> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    fn crm_product(&self, plan_id: &str) -> Result<(&str, &str), DomainError> {
        self.plan(plan_id)
            .and_then(|p| Some((p.crm_product_id.as_deref()?, p.crm_price_id.as_deref()?)))
            .ok_or_else(|| DomainError::PlanNotConfigured(plan_id.to_string()))
    }

    pub fn checkout_url(&self, plan_id: &str, contact_id: &str, clinic_id: &Uuid) -> Result<String, DomainError> {
        let (product_id, price_id) = self.crm_product(plan_id)?;
        let clinic_id = clinic_id.to_string();
        let query = serde_urlencoded::to_string([
            ("productId", product_id),
            ("priceId", price_id),
            ("contactId", contact_id),
            ("clinicId", clinic_id.as_str()),
        ])
        .map_err(|e| DomainError::InternalError(format!("Checkout query encoding failed: {}", e)))?;
        Ok(format!(
            "{}/subscriptions/create?{}",
            self.dashboard_url.trim_end_matches('/'),
            query
        ))
    }

    pub async fn find_clinic(&self, clinic_id: &Uuid) -> Result<Clinic, DomainError> {
        self.clinics.find_by_id(clinic_id).await?.ok_or(DomainError::ClinicNotFound)
    }

    /// Looks the clinic up in the CRM by email, creating the contact when
    /// missing, and remembers the contact id on the clinic.
    pub async fn ensure_crm_contact(&self, clinic: &Clinic) -> Result<CrmContact, DomainError> {
        let contact = match self.crm.find_contact_by_email(&clinic.email).await? {
            Some(contact) => contact,
            None => {
                let (first_name, last_name) =
                    split_name(clinic.primary_contact.as_deref().unwrap_or(&clinic.name));
                let new_contact = NewCrmContact {
                    email: clinic.email.clone(),
                    first_name: Some(first_name),
                    last_name: Some(last_name).filter(|l| !l.is_empty()),
                    company_name: Some(clinic.name.clone()),
                    phone: clinic.phone.clone(),
                    address1: clinic.street_address.clone(),
                    city: clinic.city.clone(),
                    state: clinic.state.clone(),
                    postal_code: clinic.zip_code.clone(),
                    tags: vec!["clinic_admin".into()],
                };
                let created = self.crm.create_contact(&new_contact).await?;
                info!(clinic_id = %clinic.id, contact_id = %created.id, "Created CRM contact for clinic");
                created
            }
        };

        if clinic.crm_contact_id.as_deref() != Some(contact.id.as_str()) {
            let mut linked = clinic.clone();
            linked.crm_contact_id = Some(contact.id.clone());
            linked.updated_at = Utc::now();
            self.clinics.update(&linked).await?;
        }
        Ok(contact)
    }

    /// Points the clinic's subscription row at the CRM contact, creating an
    /// inactive row when there is none.
    pub async fn link_subscription(
        &self,
        clinic_id: &Uuid,
        plan_id: &str,
        contact_id: &str,
    ) -> Result<SubscriptionTier, DomainError> {
        let now = Utc::now();
        let existing = self.subscriptions.find_latest_by_clinic(clinic_id).await?;
        let mut tier = match existing {
            Some(tier) => tier,
            None => {
                let fresh = SubscriptionTier {
                    crm_contact_id: Some(contact_id.to_string()),
                    provider: SubscriptionProvider::Crm,
                    ..SubscriptionTier::inactive(*clinic_id, plan_id, now)
                };
                match self.subscriptions.insert(&fresh).await {
                    Ok(created) => return Ok(created),
                    Err(DomainError::SubscriptionAlreadyExists(_)) => self
                        .subscriptions
                        .find_latest_by_clinic(clinic_id)
                        .await?
                        .ok_or(DomainError::SubscriptionNotFound)?,
                    Err(e) => return Err(e),
                }
            }
        };
        tier.plan_id = plan_id.to_string();
        tier.crm_contact_id = Some(contact_id.to_string());
        tier.provider = SubscriptionProvider::Crm;
        tier.updated_at = now;
        self.subscriptions.update(&tier).await
    }

    pub async fn overview(&self, clinic_id: &Uuid) -> Result<SubscriptionOverview, DomainError> {
        let subscription = self.subscriptions.find_latest_by_clinic(clinic_id).await?;
        let crm_details = match subscription.as_ref().and_then(|s| s.subscription_id.as_deref()) {
            Some(external_id) => match self.crm.get_subscription(external_id).await {
                Ok(details) => Some(details),
                Err(e) => {
                    warn!(clinic_id = %clinic_id, error = %e, "Could not fetch CRM subscription details");
                    None
                }
            },
            None => None,
        };
        Ok(SubscriptionOverview {
            subscription,
            crm_details,
        })
    }

    pub async fn apply(
        &self,
        clinic_id: &Uuid,
        plan_id: &str,
        action: BillingAction,
    ) -> Result<BillingOutcome, DomainError> {
        let clinic = self.find_clinic(clinic_id).await?;
        info!(clinic_id = %clinic.id, plan_id, action = action.as_str(), "Subscription change requested");
        match action {
            BillingAction::Create => self.create(&clinic, plan_id).await,
            BillingAction::Update => self.update(&clinic, plan_id).await,
            BillingAction::Cancel => self.cancel(&clinic).await,
        }
    }

    async fn create(&self, clinic: &Clinic, plan_id: &str) -> Result<BillingOutcome, DomainError> {
        // 1. Plan must exist and be sellable through the CRM
        if self.plan(plan_id).is_none() {
            return Err(DomainError::ValidationError(format!("Invalid plan: {}", plan_id)));
        }
        self.crm_product(plan_id)?;

        // 2. Refuse a second active subscription
        if let Some(existing) = self.subscriptions.find_latest_by_clinic(&clinic.id).await? {
            if existing.is_active {
                return Err(DomainError::SubscriptionAlreadyActive);
            }
        }

        // 3. Contact, local row, checkout link
        let contact = self.ensure_crm_contact(clinic).await?;
        let tier = self.link_subscription(&clinic.id, plan_id, &contact.id).await?;
        let checkout_url = self.checkout_url(plan_id, &contact.id, &clinic.id)?;

        Ok(BillingOutcome {
            message: "Redirect to the CRM to complete subscription setup".into(),
            checkout_url: Some(checkout_url),
            subscription: Some(tier),
        })
    }

    async fn update(&self, clinic: &Clinic, plan_id: &str) -> Result<BillingOutcome, DomainError> {
        let (mut tier, external_id) = self.external_subscription(clinic).await?;
        let (product_id, price_id) = self.crm_product(plan_id)?;

        self.crm.update_subscription(&external_id, product_id, price_id).await?;

        let now = Utc::now();
        tier.plan_id = plan_id.to_string();
        // Re-activated by the CRM webhook once the change is billed.
        tier.is_active = false;
        tier.end_date = Some(now);
        tier.updated_at = now;
        let tier = self.subscriptions.update(&tier).await?;

        Ok(BillingOutcome {
            message: "Subscription updated successfully".into(),
            checkout_url: None,
            subscription: Some(tier),
        })
    }

    async fn cancel(&self, clinic: &Clinic) -> Result<BillingOutcome, DomainError> {
        let (mut tier, external_id) = self.external_subscription(clinic).await?;

        self.crm.cancel_subscription(&external_id).await?;

        let now = Utc::now();
        tier.is_active = false;
        tier.end_date = Some(now);
        tier.updated_at = now;
        let tier = self.subscriptions.update(&tier).await?;

        Ok(BillingOutcome {
            message: "Subscription cancelled successfully".into(),
            checkout_url: None,
            subscription: Some(tier),
        })
    }

    async fn external_subscription(&self, clinic: &Clinic) -> Result<(SubscriptionTier, String), DomainError> {
        let tier = self
            .subscriptions
            .find_latest_by_clinic(&clinic.id)
            .await?
            .ok_or(DomainError::MissingExternalSubscription)?;
        let external_id = tier
            .subscription_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(DomainError::MissingExternalSubscription)?;
        Ok((tier, external_id))
    }
}
