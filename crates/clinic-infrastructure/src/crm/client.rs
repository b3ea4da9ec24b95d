// ============================================================================
// Clinic Infrastructure - CRM REST Client
// File: crates/clinic-infrastructure/src/crm/client.rs
// Description: reqwest implementation of the CrmClient port
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};

use clinic_core::integrations::{CrmClient, CrmContact, CrmError, CrmSubscription, CrmTask, NewCrmContact};
use clinic_shared::config::CrmSettings;

/// Envelope keys the CRM has been seen to wrap single records in.
const RECORD_ENVELOPES: [&str; 3] = ["contact", "subscription", "data"];

pub struct HttpCrmClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpCrmClient {
    pub fn new(settings: &CrmSettings) -> Result<Self, CrmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| CrmError::request("client setup", e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }

    /// Sends the request and returns the JSON body; non-2xx statuses become
    /// `CrmError` with the response body appended.
    async fn send(&self, operation: &str, builder: RequestBuilder) -> Result<(StatusCode, Value), CrmError> {
        let response = builder.send().await.map_err(|e| {
            error!("CRM {} request error: {}", operation, e);
            CrmError::request(operation, e.to_string())
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| CrmError::request(operation, e.to_string()))?;

        if !status.is_success() {
            error!("CRM {} returned {}: {}", operation, status, text);
            return Err(CrmError::request(operation, format!("HTTP {}: {}", status.as_u16(), text)));
        }

        debug!("CRM {} returned {}", operation, status);
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| CrmError::request(operation, format!("invalid JSON: {}", e)))?
        };
        Ok((status, body))
    }

    async fn send_record<T: DeserializeOwned>(&self, operation: &str, builder: RequestBuilder) -> Result<T, CrmError> {
        let (_, body) = self.send(operation, builder).await?;
        decode_record(operation, body)
    }
}

/// Accepts a record at the top level or wrapped in one of the known envelopes.
fn decode_record<T: DeserializeOwned>(operation: &str, body: Value) -> Result<T, CrmError> {
    let record = match &body {
        Value::Object(map) if !map.contains_key("id") => RECORD_ENVELOPES
            .iter()
            .find_map(|key| map.get(*key).filter(|v| v.is_object()).cloned())
            .unwrap_or(body),
        _ => body,
    };
    serde_json::from_value(record)
        .map_err(|e| CrmError::request(operation, format!("unexpected response: {}", e)))
}

#[async_trait]
impl CrmClient for HttpCrmClient {
    async fn create_contact(&self, contact: &NewCrmContact) -> Result<CrmContact, CrmError> {
        self.send_record("create contact", self.request(Method::POST, "/contacts").json(contact))
            .await
    }

    async fn update_contact(&self, contact_id: &str, fields: Value) -> Result<CrmContact, CrmError> {
        let path = format!("/contacts/{}", contact_id);
        self.send_record("update contact", self.request(Method::PUT, &path).json(&fields))
            .await
    }

    async fn find_contact_by_email(&self, email: &str) -> Result<Option<CrmContact>, CrmError> {
        let query = serde_urlencoded::to_string([("email", email)])
            .map_err(|e| CrmError::request("lookup contact", e.to_string()))?;
        let builder = self.request(Method::GET, &format!("/contacts/lookup?{}", query));
        let body = match self.send("lookup contact", builder).await {
            Ok((_, body)) => body,
            // The lookup endpoint answers 404 for an unknown email
            Err(CrmError::Request { message, .. }) if message.starts_with("HTTP 404") => return Ok(None),
            Err(e) => return Err(e),
        };

        let first = match body.get("contacts") {
            Some(Value::Array(items)) => items.first().cloned(),
            _ if body.is_null() => None,
            _ => Some(body),
        };
        first
            .map(|record| decode_record("lookup contact", record))
            .transpose()
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<CrmSubscription, CrmError> {
        let path = format!("/subscriptions/{}", subscription_id);
        self.send_record("get subscription", self.request(Method::GET, &path)).await
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        product_id: &str,
        price_id: &str,
    ) -> Result<CrmSubscription, CrmError> {
        let path = format!("/subscriptions/{}", subscription_id);
        let body = json!({ "productId": product_id, "priceId": price_id });
        self.send_record("update subscription", self.request(Method::PUT, &path).json(&body))
            .await
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), CrmError> {
        let path = format!("/subscriptions/{}/cancel", subscription_id);
        let body = json!({
            "reason": "User requested cancellation",
            "effectiveDate": chrono::Utc::now().to_rfc3339(),
        });
        self.send("cancel subscription", self.request(Method::POST, &path).json(&body))
            .await?;
        Ok(())
    }

    async fn create_task(&self, contact_id: &str, task: &CrmTask) -> Result<(), CrmError> {
        let path = format!("/contacts/{}/tasks", contact_id);
        self.send("create task", self.request(Method::POST, &path).json(task))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpCrmClient {
        HttpCrmClient::new(&CrmSettings {
            base_url: server.uri(),
            api_key: "crm-key".into(),
            dashboard_url: "https://crm.test".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn new_contact() -> NewCrmContact {
        NewCrmContact {
            email: "a@x.com".into(),
            first_name: Some("Ann".into()),
            last_name: None,
            company_name: Some("Alpha".into()),
            phone: None,
            address1: None,
            city: None,
            state: None,
            postal_code: None,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_contact_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contacts"))
            .and(header("authorization", "Bearer crm-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contact": { "id": "c-1", "email": "a@x.com", "companyName": "Alpha" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let contact = client_for(&server).create_contact(&new_contact()).await.unwrap();
        assert_eq!(contact.id, "c-1");
        assert_eq!(contact.company_name.as_deref(), Some("Alpha"));
    }

    #[tokio::test]
    async fn test_error_carries_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contacts"))
            .respond_with(ResponseTemplate::new(422).set_body_string("email is invalid"))
            .mount(&server)
            .await;

        let err = client_for(&server).create_contact(&new_contact()).await.unwrap_err();
        let CrmError::Request { operation, message } = err;
        assert_eq!(operation, "create contact");
        assert!(message.contains("422"));
        assert!(message.contains("email is invalid"));
    }

    #[tokio::test]
    async fn test_find_contact_by_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contacts/lookup"))
            .and(query_param("email", "a@x.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contacts": [{ "id": "c-9", "email": "a@x.com" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/contacts/lookup"))
            .and(query_param("email", "none@x.com"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let found = client.find_contact_by_email("a@x.com").await.unwrap();
        assert_eq!(found.map(|c| c.id), Some("c-9".to_string()));
        assert!(client.find_contact_by_email("none@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_cancel_subscription() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/subscriptions/sub-1"))
            .and(body_json(json!({ "productId": "prod-2", "priceId": "price-2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "sub-1", "status": "active", "productId": "prod-2", "priceId": "price-2"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/subscriptions/sub-1/cancel"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let sub = client.update_subscription("sub-1", "prod-2", "price-2").await.unwrap();
        assert_eq!(sub.product_id.as_deref(), Some("prod-2"));
        client.cancel_subscription("sub-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_create_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contacts/c-1/tasks"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "t-1" })))
            .expect(1)
            .mount(&server)
            .await;

        let task = CrmTask {
            title: "Onboarding call".into(),
            body: "Schedule onboarding".into(),
            due_date: chrono::Utc::now(),
        };
        client_for(&server).create_task("c-1", &task).await.unwrap();
    }
}
