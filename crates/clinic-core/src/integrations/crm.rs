//! CRM port: contacts, subscriptions and follow-up tasks in the external
//! marketing platform.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrmError {
    /// Carries the upstream message and, when available, the response body.
    #[error("CRM {operation} failed: {message}")]
    Request { operation: String, message: String },
}

impl CrmError {
    pub fn request(operation: &str, message: impl Into<String>) -> Self {
        CrmError::Request {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmContact {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCrmContact {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmSubscription {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub price_id: Option<String>,
    #[serde(default)]
    pub next_billing_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmTask {
    pub title: String,
    pub body: String,
    pub due_date: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CrmClient: Send + Sync {
    async fn create_contact(&self, contact: &NewCrmContact) -> Result<CrmContact, CrmError>;
    async fn update_contact(
        &self,
        contact_id: &str,
        fields: serde_json::Value,
    ) -> Result<CrmContact, CrmError>;
    async fn find_contact_by_email(&self, email: &str) -> Result<Option<CrmContact>, CrmError>;
    async fn get_subscription(&self, subscription_id: &str) -> Result<CrmSubscription, CrmError>;
    async fn update_subscription(
        &self,
        subscription_id: &str,
        product_id: &str,
        price_id: &str,
    ) -> Result<CrmSubscription, CrmError>;
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), CrmError>;
    async fn create_task(&self, contact_id: &str, task: &CrmTask) -> Result<(), CrmError>;
}
