#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use clinic_api::{build_router, AppState};
use clinic_core::repositories::{InMemoryStore, Repositories};
use clinic_infrastructure::{HttpCrmClient, LogMailer};
use clinic_shared::config::{
    AppConfig, AppSettings, CrmSettings, DatabaseSettings, JwtSettings, LoggingSettings, MailSettings, PlanSettings,
    UnknownStatusPolicy, WebhookSettings,
};

pub const WEBHOOK_TOKEN: &str = "test-webhook-token";
pub const STRONG_PASSWORD: &str = "Tangerine-Violin-Orbit-77";

pub fn test_config(crm_base_url: &str, unknown_status: UnknownStatusPolicy) -> AppConfig {
    AppConfig {
        app: AppSettings {
            env: "test".into(),
            host: "127.0.0.1".into(),
            port: 0,
            name: "clinic-server".into(),
            public_base_url: "http://localhost:8080".into(),
        },
        database: DatabaseSettings {
            url: "memory://".into(),
            max_connections: 1,
            acquire_timeout_secs: 1,
        },
        jwt: JwtSettings {
            secret: "integration-secret".into(),
            session_ttl_secs: 3600,
        },
        webhook: WebhookSettings {
            bearer_token: Some(WEBHOOK_TOKEN.into()),
            custom_secret: None,
            signature_secret: None,
            unknown_status,
        },
        crm: CrmSettings {
            base_url: crm_base_url.into(),
            api_key: "crm-key".into(),
            dashboard_url: "https://crm.test".into(),
            timeout_secs: 5,
        },
        mail: MailSettings {
            enabled: false,
            smtp_host: "localhost".into(),
            smtp_port: 25,
            username: None,
            password: None,
            from_address: "no-reply@clinic.test".into(),
        },
        logging: LoggingSettings {
            level: "debug".into(),
            json: false,
            directory: None,
        },
        plans: vec![PlanSettings {
            id: "basic_plan".into(),
            name: "Basic Plan".into(),
            price: 99.0,
            payment_link: Some("https://pay.test/basic".into()),
            crm_product_id: Some("prod_basic".into()),
            crm_price_id: Some("price_basic".into()),
        }],
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    pub fn new(crm_base_url: &str) -> Self {
        Self::with_policy(crm_base_url, UnknownStatusPolicy::Activate)
    }

    pub fn with_policy(crm_base_url: &str, unknown_status: UnknownStatusPolicy) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let repos = Repositories::from_store(store.clone());
        Self::with_repositories(test_config(crm_base_url, unknown_status), store, repos)
    }

    /// `store` backs the assertions; `repos` may swap individual stores out.
    pub fn with_repositories(config: AppConfig, store: Arc<InMemoryStore>, repos: Repositories) -> Self {
        let crm = Arc::new(HttpCrmClient::new(&config.crm).unwrap());
        let mailer = Arc::new(LogMailer::new().unwrap());
        let state = AppState::new(config, repos, mailer, crm);
        Self {
            router: build_router(state),
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn webhook(&self, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::post("/api/webhooks/subscription")
                .header(header::AUTHORIZATION, format!("Bearer {}", WEBHOOK_TOKEN))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::get(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post_json(
                "/api/auth/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }
}

pub fn registration_body(clinic_email: &str, admin_email: &str) -> Value {
    serde_json::json!({
        "clinicName": "Sunrise Wellness",
        "clinicEmail": clinic_email,
        "clinicPhone": "555-0100",
        "streetAddress": "1 Main St",
        "city": "Springfield",
        "state": "IL",
        "zipCode": "62701",
        "primaryContact": "Dana Reyes",
        "email": admin_email,
        "password": STRONG_PASSWORD,
        "confirmPassword": STRONG_PASSWORD,
        "hipaaAcknowledgment": true,
        "legalAcknowledgment": true,
        "selectedPlan": "basic_plan",
        "additionalCoaches": [
            { "name": "Cory Coach", "email": "cory@sunrise.test", "phone": "555-0101" }
        ]
    })
}
