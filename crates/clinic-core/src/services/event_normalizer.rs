//! Webhook payload → [`CanonicalEvent`]
//!
//! Each canonical field is read from its primary key, then from its aliases,
//! first present value wins. No type coercion happens here.

use serde_json::{Map, Value};

use crate::domain::CanonicalEvent;
use crate::error::DomainError;

/// A flat key/value payload.
pub type Payload = Map<String, Value>;

const SUBSCRIPTION_ID: &[&str] = &["subscription_id", "subscriptionId"];
const CUSTOMER_ID: &[&str] = &["customer_id", "customerId", "contact_id", "contactId", "clinic_id"];
const CUSTOMER_EMAIL: &[&str] = &["customer_email", "contact_email", "email", "clinic_email"];
const PLAN_ID: &[&str] = &["plan_id", "planId", "productName"];
const AMOUNT: &[&str] = &["amount", "payment_amount"];
const START_DATE: &[&str] = &["start_date", "startDate"];
const END_DATE: &[&str] = &["end_date", "endDate", "nextBillingDate"];
const FAILURE_REASON: &[&str] = &["failure_reason", "failureReason"];
const CLINIC_NAME: &[&str] = &["clinic_name", "companyName"];
const CONTACT_NAME: &[&str] = &["contact_name", "contactName"];
const PHONE: &[&str] = &["phone", "phone_number"];
const RAW_STATUS: &[&str] = &["event", "status", "event_type", "eventType"];

/// Parses a request body as a JSON object, falling back to
/// `application/x-www-form-urlencoded`.
pub fn parse_payload(body: &[u8]) -> Result<Payload, DomainError> {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        return match value {
            Value::Object(map) => Ok(map),
            _ => Err(DomainError::ValidationError(
                "Webhook payload must be a JSON object".into(),
            )),
        };
    }

    let text = std::str::from_utf8(body)
        .map_err(|_| DomainError::ValidationError("Webhook payload is not valid UTF-8".into()))?;
    if !text.contains('=') {
        return Err(DomainError::ValidationError(
            "Webhook payload is neither JSON nor form-encoded".into(),
        ));
    }
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(text)
        .map_err(|e| DomainError::ValidationError(format!("Invalid form payload: {}", e)))?;

    let mut map = Payload::new();
    for (key, value) in pairs {
        // Repeated keys keep the first occurrence.
        map.entry(key).or_insert(Value::String(value));
    }
    Ok(map)
}

fn pick(payload: &Payload, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match payload.get(*key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

pub fn normalize(payload: &Payload) -> CanonicalEvent {
    CanonicalEvent {
        subscription_id: pick(payload, SUBSCRIPTION_ID),
        customer_id: pick(payload, CUSTOMER_ID),
        customer_email: pick(payload, CUSTOMER_EMAIL),
        plan_id: pick(payload, PLAN_ID),
        amount: pick(payload, AMOUNT),
        start_date: pick(payload, START_DATE),
        end_date: pick(payload, END_DATE),
        failure_reason: pick(payload, FAILURE_REASON),
        clinic_name: pick(payload, CLINIC_NAME),
        contact_name: pick(payload, CONTACT_NAME),
        phone: pick(payload, PHONE),
        raw_status: pick(payload, RAW_STATUS),
    }
}
