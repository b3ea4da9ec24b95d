//! Finds the clinic a subscription event belongs to.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use clinic_shared::utils::mask_email;

use crate::domain::{CanonicalEvent, Clinic};
use crate::error::DomainError;
use crate::repositories::ClinicRepository;

pub struct ClinicResolver {
    clinics: Arc<dyn ClinicRepository>,
}

impl ClinicResolver {
    pub fn new(clinics: Arc<dyn ClinicRepository>) -> Self {
        Self { clinics }
    }

    /// Email first, then CRM contact id, then `customer_id` as a clinic id.
    /// Never creates anything.
    pub async fn resolve(&self, event: &CanonicalEvent) -> Result<Option<Clinic>, DomainError> {
        if let Some(email) = event.customer_email.as_deref().filter(|e| !e.is_empty()) {
            if let Some(clinic) = self.clinics.find_by_email(email).await? {
                return Ok(Some(clinic));
            }
        }

        if let Some(customer_id) = event.customer_id.as_deref().filter(|c| !c.is_empty()) {
            if let Some(clinic) = self.clinics.find_by_crm_contact_id(customer_id).await? {
                return Ok(Some(clinic));
            }
            if let Ok(id) = Uuid::parse_str(customer_id) {
                if let Some(clinic) = self.clinics.find_by_id(&id).await? {
                    return Ok(Some(clinic));
                }
            }
        }

        Ok(None)
    }

    /// Resolves, and when nothing matches creates a clinic from the event.
    /// Only the activation path may call this.
    pub async fn resolve_or_create(&self, event: &CanonicalEvent) -> Result<Option<Clinic>, DomainError> {
        if let Some(clinic) = self.resolve(event).await? {
            return Ok(Some(clinic));
        }

        let Some(email) = event.customer_email.as_deref().filter(|e| !e.is_empty()) else {
            warn!("Cannot create clinic from event without an email");
            return Ok(None);
        };

        fn non_blank(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|n| !n.trim().is_empty())
        }
        let name = non_blank(&event.clinic_name)
            .or_else(|| non_blank(&event.contact_name))
            .unwrap_or(email);

        let mut clinic = Clinic::new(name, email)?;
        clinic.phone = event.phone.clone();
        clinic.primary_contact = event.contact_name.clone();
        clinic.crm_contact_id = event.customer_id.clone().filter(|c| !c.is_empty());

        // A concurrent delivery may have created it since the lookup
        match self.clinics.create(&clinic).await {
            Ok(created) => {
                info!(clinic_id = %created.id, email = %mask_email(email), "Created clinic from subscription event");
                Ok(Some(created))
            }
            Err(DomainError::ClinicAlreadyExists(_)) => {
                info!(email = %mask_email(email), "Clinic created concurrently, using the stored row");
                self.clinics.find_by_email(&clinic.email).await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryStore, MockClinicRepository};
    use mockall::Sequence;

    async fn store_with_clinic() -> (Arc<InMemoryStore>, Clinic) {
        let store = Arc::new(InMemoryStore::new());
        let mut clinic = Clinic::new("Sunrise", "front@sunrise.test").unwrap();
        clinic.crm_contact_id = Some("crm-42".into());
        store.create(&clinic).await.unwrap();
        (store, clinic)
    }

    #[tokio::test]
    async fn test_resolve_by_email_contact_and_id() {
        let (store, clinic) = store_with_clinic().await;
        let resolver = ClinicResolver::new(store);

        let by_email = CanonicalEvent {
            customer_email: Some("front@sunrise.test".into()),
            ..Default::default()
        };
        assert_eq!(resolver.resolve(&by_email).await.unwrap().map(|c| c.id), Some(clinic.id));

        let by_contact = CanonicalEvent {
            customer_email: Some("other@nowhere.test".into()),
            customer_id: Some("crm-42".into()),
            ..Default::default()
        };
        assert_eq!(resolver.resolve(&by_contact).await.unwrap().map(|c| c.id), Some(clinic.id));

        let by_id = CanonicalEvent {
            customer_id: Some(clinic.id.to_string()),
            ..Default::default()
        };
        assert_eq!(resolver.resolve(&by_id).await.unwrap().map(|c| c.id), Some(clinic.id));
    }

    #[tokio::test]
    async fn test_email_match_is_case_sensitive() {
        let (store, _) = store_with_clinic().await;
        let resolver = ClinicResolver::new(store);
        let event = CanonicalEvent {
            customer_email: Some("FRONT@sunrise.test".into()),
            ..Default::default()
        };
        assert!(resolver.resolve(&event).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_or_create_uses_event_details() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = ClinicResolver::new(store.clone());
        let event = CanonicalEvent {
            customer_email: Some("new@clinic.test".into()),
            contact_name: Some("Pat Lee".into()),
            phone: Some("555-0101".into()),
            ..Default::default()
        };
        let clinic = resolver.resolve_or_create(&event).await.unwrap().unwrap();
        assert_eq!(clinic.name, "Pat Lee");
        assert_eq!(clinic.primary_contact.as_deref(), Some("Pat Lee"));
        assert_eq!(clinic.phone.as_deref(), Some("555-0101"));
        assert!(store.find_by_email("new@clinic.test").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_blank_clinic_name_falls_back_to_contact_name() {
        let resolver = ClinicResolver::new(Arc::new(InMemoryStore::new()));
        let event = CanonicalEvent {
            customer_email: Some("new@clinic.test".into()),
            clinic_name: Some("  ".into()),
            contact_name: Some("Pat".into()),
            ..Default::default()
        };
        let clinic = resolver.resolve_or_create(&event).await.unwrap().unwrap();
        assert_eq!(clinic.name, "Pat");
    }

    #[tokio::test]
    async fn test_create_conflict_returns_stored_clinic() {
        let existing = Clinic::new("Sunrise", "front@sunrise.test").unwrap();
        let stored = existing.clone();
        let mut seq = Sequence::new();
        let mut clinics = MockClinicRepository::new();
        // Another delivery inserts between the lookup and the create
        clinics
            .expect_find_by_email()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        clinics
            .expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|c| Err(DomainError::ClinicAlreadyExists(c.email.clone())));
        clinics
            .expect_find_by_email()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(stored.clone())));
        let resolver = ClinicResolver::new(Arc::new(clinics));

        let event = CanonicalEvent {
            customer_email: Some("front@sunrise.test".into()),
            ..Default::default()
        };
        let clinic = resolver.resolve_or_create(&event).await.unwrap().unwrap();
        assert_eq!(clinic.id, existing.id);
    }

    #[tokio::test]
    async fn test_resolve_or_create_needs_email() {
        let resolver = ClinicResolver::new(Arc::new(InMemoryStore::new()));
        let event = CanonicalEvent {
            customer_id: Some("crm-unknown".into()),
            ..Default::default()
        };
        assert!(resolver.resolve_or_create(&event).await.unwrap().is_none());
    }
}
