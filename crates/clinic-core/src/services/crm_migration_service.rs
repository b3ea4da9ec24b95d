//! Admin tooling that moves locally billed clinics onto the CRM.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use super::billing_service::BillingService;
use crate::domain::{SubscriptionProvider, SubscriptionTier};
use crate::error::DomainError;
use crate::integrations::CrmSubscription;
use crate::repositories::{ClinicRepository, SubscriptionRepository};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicMigrationRow {
    pub clinic_id: Uuid,
    pub clinic_name: String,
    pub clinic_email: String,
    /// `crm`, `local` or `none`.
    pub subscription_provider: String,
    pub plan_id: Option<String>,
    pub is_active: bool,
    pub has_crm_contact: bool,
    pub has_crm_subscription: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub clinic_id: Uuid,
    pub clinic_name: String,
    pub contact_id: String,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMigrationEntry {
    pub clinic_id: Uuid,
    pub clinic_name: String,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    pub clinic_id: Uuid,
    pub clinic_name: String,
    /// Provider name, or `no_subscription`.
    pub status: String,
    pub subscription: Option<SubscriptionTier>,
    pub crm_details: Option<CrmSubscription>,
}

pub struct CrmMigrationService {
    clinics: Arc<dyn ClinicRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    billing: Arc<BillingService>,
}

impl CrmMigrationService {
    pub fn new(
        clinics: Arc<dyn ClinicRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        billing: Arc<BillingService>,
    ) -> Self {
        Self {
            clinics,
            subscriptions,
            billing,
        }
    }

    pub async fn list(&self) -> Result<Vec<ClinicMigrationRow>, DomainError> {
        let clinics = self.clinics.list().await?;
        let mut rows = Vec::with_capacity(clinics.len());
        for clinic in clinics {
            let tier = self.subscriptions.find_latest_by_clinic(&clinic.id).await?;
            rows.push(ClinicMigrationRow {
                clinic_id: clinic.id,
                has_crm_contact: clinic.has_crm_contact(),
                clinic_name: clinic.name,
                clinic_email: clinic.email,
                subscription_provider: tier
                    .as_ref()
                    .map_or("none", |t| t.provider.as_str())
                    .to_string(),
                plan_id: tier.as_ref().map(|t| t.plan_id.clone()),
                is_active: tier.as_ref().is_some_and(|t| t.is_active),
                has_crm_subscription: tier.as_ref().is_some_and(|t| t.subscription_id.is_some()),
            });
        }
        Ok(rows)
    }

    pub async fn migrate(&self, clinic_id: &Uuid) -> Result<MigrationResult, DomainError> {
        // 1. Clinic and its subscription row must exist
        let clinic = self.billing.find_clinic(clinic_id).await?;
        let tier = self
            .subscriptions
            .find_latest_by_clinic(clinic_id)
            .await?
            .ok_or(DomainError::SubscriptionNotFound)?;
        if tier.provider == SubscriptionProvider::Crm {
            return Err(DomainError::AlreadyOnCrm);
        }

        // 2. Contact in the CRM, linked locally
        let contact = self.billing.ensure_crm_contact(&clinic).await?;
        self.billing
            .link_subscription(clinic_id, &tier.plan_id, &contact.id)
            .await?;

        // 3. Checkout link for the clinic's current plan
        let checkout_url = self.billing.checkout_url(&tier.plan_id, &contact.id, clinic_id)?;
        info!(clinic_id = %clinic_id, contact_id = %contact.id, "Clinic migrated to CRM billing");

        Ok(MigrationResult {
            clinic_id: clinic.id,
            clinic_name: clinic.name,
            contact_id: contact.id,
            checkout_url,
        })
    }

    /// Migrates every clinic not yet on the CRM; one clinic's failure is
    /// recorded and does not stop the rest.
    pub async fn bulk_migrate(&self) -> Result<Vec<BulkMigrationEntry>, DomainError> {
        let clinics = self.clinics.list().await?;
        let mut results = Vec::new();
        for clinic in clinics {
            let tier = self.subscriptions.find_latest_by_clinic(&clinic.id).await?;
            if tier.is_some_and(|t| t.provider == SubscriptionProvider::Crm) {
                continue;
            }
            let entry = match self.migrate(&clinic.id).await {
                Ok(_) => BulkMigrationEntry {
                    clinic_id: clinic.id,
                    clinic_name: clinic.name,
                    success: true,
                    message: "Clinic set up with CRM billing".into(),
                },
                Err(e) => {
                    error!(clinic_id = %clinic.id, error = %e, "Bulk migration failed for clinic");
                    BulkMigrationEntry {
                        clinic_id: clinic.id,
                        clinic_name: clinic.name,
                        success: false,
                        message: e.to_string(),
                    }
                }
            };
            results.push(entry);
        }
        Ok(results)
    }

    pub async fn check_status(&self, clinic_id: &Uuid) -> Result<MigrationStatus, DomainError> {
        let clinic = self.billing.find_clinic(clinic_id).await?;
        let overview = self.billing.overview(clinic_id).await?;
        let status = overview
            .subscription
            .as_ref()
            .map_or("no_subscription", |t| t.provider.as_str())
            .to_string();
        Ok(MigrationStatus {
            clinic_id: clinic.id,
            clinic_name: clinic.name,
            status,
            subscription: overview.subscription,
            crm_details: overview.crm_details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clinic_shared::config::PlanSettings;

    use crate::domain::Clinic;
    use crate::integrations::{CrmContact, MockCrmClient};
    use crate::repositories::InMemoryStore;

    fn service(store: Arc<InMemoryStore>, crm: MockCrmClient) -> CrmMigrationService {
        let billing = BillingService::new(
            store.clone(),
            store.clone(),
            Arc::new(crm),
            vec![PlanSettings {
                id: "basic_plan".into(),
                name: "Basic Plan".into(),
                price: 99.0,
                payment_link: None,
                crm_product_id: Some("prod_1".into()),
                crm_price_id: Some("price_1".into()),
            }],
            "https://crm.example".into(),
        );
        CrmMigrationService::new(store.clone(), store, Arc::new(billing))
    }

    fn contact_mock() -> MockCrmClient {
        let mut crm = MockCrmClient::new();
        crm.expect_find_contact_by_email().returning(|_| Ok(None));
        crm.expect_create_contact().returning(|c| {
            Ok(CrmContact {
                id: format!("ct_{}", c.email),
                email: Some(c.email.clone()),
                first_name: None,
                last_name: None,
                company_name: None,
                phone: None,
                tags: vec![],
            })
        });
        crm
    }

    async fn clinic_with(store: &InMemoryStore, email: &str, tier: Option<SubscriptionTier>) -> Clinic {
        let clinic = Clinic::new("Clinic", email).unwrap();
        ClinicRepository::create(store, &clinic).await.unwrap();
        if let Some(mut tier) = tier {
            tier.clinic_id = clinic.id;
            store.insert(&tier).await.unwrap();
        }
        clinic
    }

    #[tokio::test]
    async fn test_migrate_links_contact_and_flags_provider() {
        let store = Arc::new(InMemoryStore::new());
        let clinic = clinic_with(
            &store,
            "a@b.com",
            Some(SubscriptionTier::inactive(Uuid::nil(), "basic_plan", Utc::now())),
        )
        .await;
        let svc = service(store.clone(), contact_mock());

        let result = svc.migrate(&clinic.id).await.unwrap();
        assert_eq!(result.contact_id, "ct_a@b.com");
        assert!(result.checkout_url.contains("productId=prod_1"));

        let rows = svc.list().await.unwrap();
        assert_eq!(rows[0].subscription_provider, "crm");
        assert!(rows[0].has_crm_contact);
        assert!(matches!(svc.migrate(&clinic.id).await, Err(DomainError::AlreadyOnCrm)));
    }

    #[tokio::test]
    async fn test_bulk_migrate_isolates_failures() {
        let store = Arc::new(InMemoryStore::new());
        clinic_with(
            &store,
            "ok@b.com",
            Some(SubscriptionTier::inactive(Uuid::nil(), "basic_plan", Utc::now())),
        )
        .await;
        clinic_with(&store, "nosub@b.com", None).await;
        let svc = service(store.clone(), contact_mock());

        let results = svc.bulk_migrate().await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.success).count(), 1);

        let status = svc.check_status(&results[0].clinic_id).await.unwrap();
        assert!(status.status == "crm" || status.status == "no_subscription");
    }

    #[tokio::test]
    async fn test_migrate_unknown_clinic() {
        let svc = service(Arc::new(InMemoryStore::new()), MockCrmClient::new());
        assert!(matches!(svc.migrate(&Uuid::new_v4()).await, Err(DomainError::ClinicNotFound)));
    }
}
