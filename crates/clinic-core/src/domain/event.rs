//! Canonical subscription event, produced by normalization and discarded
//! after processing.

use serde::{Deserialize, Serialize};

/// Every field is `None` when absent from the payload. An empty string is
/// present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    pub plan_id: Option<String>,
    pub amount: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub failure_reason: Option<String>,
    pub clinic_name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub raw_status: Option<String>,
}
