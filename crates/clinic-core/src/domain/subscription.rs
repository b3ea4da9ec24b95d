// ============================================================================
// Clinic Core - Subscription Entities
// File: crates/clinic-core/src/domain/subscription.rs
// Description: Per-clinic subscription state and the payment ledger
// ============================================================================

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Where the subscription is billed. `Local` rows predate the CRM link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionProvider {
    Crm,
    #[default]
    Local,
}

impl SubscriptionProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionProvider::Crm => "crm",
            SubscriptionProvider::Local => "local",
        }
    }
}

impl FromStr for SubscriptionProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crm" => Ok(SubscriptionProvider::Crm),
            "local" => Ok(SubscriptionProvider::Local),
            _ => Err(DomainError::ValidationError(format!("Unknown subscription provider: {}", s))),
        }
    }
}

/// At most one row per clinic. `is_active` implies `end_date` is unset or in
/// the future; an inactive row carries the time it stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionTier {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub plan_id: String,
    pub subscription_id: Option<String>,
    pub crm_contact_id: Option<String>,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub provider: SubscriptionProvider,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionTier {
    /// Placeholder written at registration; activation arrives later by webhook.
    pub fn inactive(clinic_id: Uuid, plan_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            clinic_id,
            plan_id: plan_id.to_string(),
            subscription_id: None,
            crm_contact_id: None,
            is_active: false,
            start_date: Some(now),
            end_date: None,
            provider: SubscriptionProvider::Local,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_date.map_or(true, |end| end > now)
    }
}

/// Append-only payment ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionHistory {
    pub id: Uuid,
    pub clinic_id: Uuid,
    /// The `SubscriptionTier` row the payment belongs to.
    pub subscription_id: Uuid,
    pub payment_amount: f64,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionHistory {
    pub fn new(clinic_id: Uuid, subscription_id: Uuid, payment_amount: f64, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            clinic_id,
            subscription_id,
            payment_amount,
            created_at: now,
        }
    }
}
