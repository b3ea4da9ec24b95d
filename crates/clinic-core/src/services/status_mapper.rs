//! Vendor status → canonical trigger
//!
//! Total and side-effect free. Missing or unrecognized input maps to
//! `subscription.activated`; callers that need to tell the two apart use
//! [`resolve_status`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SubscriptionTrigger {
    #[serde(rename = "subscription.activated")]
    #[default]
    Activated,
    #[serde(rename = "subscription.cancelled")]
    Cancelled,
    #[serde(rename = "subscription.payment_failed")]
    PaymentFailed,
    #[serde(rename = "subscription.renewed")]
    Renewed,
}

impl SubscriptionTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTrigger::Activated => "subscription.activated",
            SubscriptionTrigger::Cancelled => "subscription.cancelled",
            SubscriptionTrigger::PaymentFailed => "subscription.payment_failed",
            SubscriptionTrigger::Renewed => "subscription.renewed",
        }
    }

    pub fn all() -> [SubscriptionTrigger; 4] {
        [
            SubscriptionTrigger::Activated,
            SubscriptionTrigger::Cancelled,
            SubscriptionTrigger::PaymentFailed,
            SubscriptionTrigger::Renewed,
        ]
    }
}

impl FromStr for SubscriptionTrigger {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription.activated" => Ok(SubscriptionTrigger::Activated),
            "subscription.cancelled" => Ok(SubscriptionTrigger::Cancelled),
            "subscription.payment_failed" => Ok(SubscriptionTrigger::PaymentFailed),
            "subscription.renewed" => Ok(SubscriptionTrigger::Renewed),
            _ => Err(DomainError::ValidationError(format!("Unknown trigger: {}", s))),
        }
    }
}

impl std::fmt::Display for SubscriptionTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const STATUS_TABLE: &[(&str, SubscriptionTrigger)] = &[
    ("active", SubscriptionTrigger::Activated),
    ("activated", SubscriptionTrigger::Activated),
    ("created", SubscriptionTrigger::Activated),
    ("updated", SubscriptionTrigger::Activated),
    ("resumed", SubscriptionTrigger::Activated),
    ("trialing", SubscriptionTrigger::Activated),
    ("subscription.created", SubscriptionTrigger::Activated),
    ("subscription.activated", SubscriptionTrigger::Activated),
    ("subscription.updated", SubscriptionTrigger::Activated),
    ("subscription.resumed", SubscriptionTrigger::Activated),
    ("cancelled", SubscriptionTrigger::Cancelled),
    ("canceled", SubscriptionTrigger::Cancelled),
    ("deactivated", SubscriptionTrigger::Cancelled),
    ("paused", SubscriptionTrigger::Cancelled),
    ("subscription.cancelled", SubscriptionTrigger::Cancelled),
    ("subscription.deactivated", SubscriptionTrigger::Cancelled),
    ("subscription.paused", SubscriptionTrigger::Cancelled),
    ("failed", SubscriptionTrigger::PaymentFailed),
    ("payment_failed", SubscriptionTrigger::PaymentFailed),
    ("past_due", SubscriptionTrigger::PaymentFailed),
    ("unpaid", SubscriptionTrigger::PaymentFailed),
    ("subscription.payment_failed", SubscriptionTrigger::PaymentFailed),
    ("renewed", SubscriptionTrigger::Renewed),
    ("payment_success", SubscriptionTrigger::Renewed),
    ("subscription.renewed", SubscriptionTrigger::Renewed),
    ("subscription.payment_success", SubscriptionTrigger::Renewed),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusResolution {
    pub trigger: SubscriptionTrigger,
    /// False when the input was missing or not in the table.
    pub recognized: bool,
}

pub fn resolve_status(raw: Option<&str>) -> StatusResolution {
    let normalized = raw.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    let found = STATUS_TABLE
        .iter()
        .find(|(status, _)| *status == normalized)
        .map(|(_, trigger)| *trigger);

    match found {
        Some(trigger) => {
            debug!(raw_status = ?raw, trigger = trigger.as_str(), "Mapped subscription status");
            StatusResolution { trigger, recognized: true }
        }
        None => {
            warn!(raw_status = ?raw, "Unrecognized subscription status, defaulting to activation");
            StatusResolution {
                trigger: SubscriptionTrigger::Activated,
                recognized: false,
            }
        }
    }
}

pub fn map_status(raw: Option<&str>) -> SubscriptionTrigger {
    resolve_status(raw).trigger
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_entry_maps_case_insensitively() {
        for (status, trigger) in STATUS_TABLE {
            assert_eq!(map_status(Some(status)), *trigger);
            assert_eq!(map_status(Some(&status.to_uppercase())), *trigger);
            assert!(resolve_status(Some(&format!("  {}  ", status))).recognized);
        }
    }

    #[test]
    fn test_missing_or_unknown_defaults_to_activated() {
        for raw in [None, Some(""), Some("refunded"), Some("subscription.exploded")] {
            let resolution = resolve_status(raw);
            assert_eq!(resolution.trigger, SubscriptionTrigger::Activated);
            assert!(!resolution.recognized);
        }
    }

    #[test]
    fn test_trigger_names_round_trip() {
        for trigger in SubscriptionTrigger::all() {
            assert_eq!(trigger.as_str().parse::<SubscriptionTrigger>().ok(), Some(trigger));
        }
        assert!("subscription.deleted".parse::<SubscriptionTrigger>().is_err());
        assert_eq!(SubscriptionTrigger::default(), SubscriptionTrigger::Activated);
    }
}
