// ============================================================================
// Clinic Core - Clinic Entity
// File: crates/clinic-core/src/domain/clinic.rs
// Description: Tenant entity; owns users and the subscription row
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Clinic {
    pub id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Clinic name must be between 1 and 200 characters"))]
    pub name: String,

    #[validate(email(message = "Clinic email is invalid"))]
    pub email: String,

    pub phone: Option<String>,
    pub primary_contact: Option<String>,

    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,

    /// Contact id in the external CRM, once linked.
    pub crm_contact_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Clinic {
    pub fn new(name: &str, email: &str) -> Result<Self, validator::ValidationErrors> {
        let now = Utc::now();
        let clinic = Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            phone: None,
            primary_contact: None,
            street_address: None,
            city: None,
            state: None,
            zip_code: None,
            crm_contact_id: None,
            created_at: now,
            updated_at: now,
        };
        clinic.validate()?;
        Ok(clinic)
    }

    pub fn has_crm_contact(&self) -> bool {
        self.crm_contact_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}
