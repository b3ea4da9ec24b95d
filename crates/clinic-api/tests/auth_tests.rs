//! Registration, sessions and the route guards.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;

use clinic_core::domain::{User, UserRole};
use clinic_core::repositories::{ClinicRepository, SubscriptionRepository, UserRepository};
use clinic_security::PasswordService;

use common::{registration_body, TestApp, STRONG_PASSWORD};

const UNUSED_CRM: &str = "http://127.0.0.1:9";

#[tokio::test]
async fn test_registration_login_and_activation() {
    let app = TestApp::new(UNUSED_CRM);

    // 1. Register
    let (status, body) = app
        .post_json(
            "/api/auth/clinic-register",
            None,
            registration_body("front@sunrise.test", "dana@sunrise.test"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["url"], "/login");
    assert_eq!(body["data"]["paymentLink"], "https://pay.test/basic");
    assert_eq!(body["data"]["coachesCreated"], json!(["cory@sunrise.test"]));

    // 2. Login with an inactive placeholder subscription
    let token = app.login("dana@sunrise.test", STRONG_PASSWORD).await;
    let (status, body) = app.get("/api/auth/check-subscription", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isValid"], false);
    assert_eq!(body["data"]["message"], "Subscription is inactive");

    // 3. Subscription guard blocks the workspace
    let (status, body) = app.get("/api/clinic", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["data"]["redirectTo"]
        .as_str()
        .unwrap()
        .starts_with("/login?error=subscription_inactive"));

    // 4. Activation arrives by webhook, refresh picks it up
    let (status, _) = app
        .webhook(json!({ "event": "active", "customer_email": "front@sunrise.test" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post_json("/api/auth/refresh", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subscription"]["isValid"], true);
    let refreshed = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/clinic", Some(&refreshed)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["clinic"]["email"], "front@sunrise.test");
    assert_eq!(body["data"]["members"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_registration_validation_has_no_side_effects() {
    let app = TestApp::new(UNUSED_CRM);

    let mut body = registration_body("front@sunrise.test", "dana@sunrise.test");
    body["confirmPassword"] = json!("Different-Password-99");
    let (status, response) = app.post_json("/api/auth/clinic-register", None, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Validation error: Passwords do not match");

    let mut body = registration_body("front@sunrise.test", "dana@sunrise.test");
    body["hipaaAcknowledgment"] = json!(false);
    let (status, _) = app.post_json("/api/auth/clinic-register", None, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post_json("/api/auth/clinic-register", None, json!({ "clinicName": "Half" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(ClinicRepository::list(app.store.as_ref()).await.unwrap().is_empty());
    assert!(SubscriptionRepository::list(app.store.as_ref()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_admin_email_conflicts() {
    let app = TestApp::new(UNUSED_CRM);
    let body = registration_body("front@sunrise.test", "dana@sunrise.test");

    let (status, _) = app.post_json("/api/auth/clinic-register", None, body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.post_json("/api/auth/clinic-register", None, body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(ClinicRepository::list(app.store.as_ref()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_login_failures_and_missing_session() {
    let app = TestApp::new(UNUSED_CRM);

    let (status, _) = app
        .post_json(
            "/api/auth/login",
            None,
            json!({ "email": "nobody@x.test", "password": "whatever-123" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/auth/check-subscription", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/auth/check-subscription", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let app = TestApp::new(UNUSED_CRM);
    let admin = User::new(
        "Root Admin",
        "root@platform.test",
        None,
        UserRole::Admin,
        PasswordService::hash(STRONG_PASSWORD).unwrap(),
        None,
    )
    .unwrap();
    UserRepository::create(app.store.as_ref(), &admin).await.unwrap();
    let token = app.login("root@platform.test", STRONG_PASSWORD).await;

    let (status, body) = app
        .send(
            Request::get("/api/auth/check-subscription")
                .header(header::COOKIE, format!("session_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Admin user - no subscription required");
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let app = TestApp::new(UNUSED_CRM);
    app.post_json(
        "/api/auth/clinic-register",
        None,
        registration_body("front@sunrise.test", "dana@sunrise.test"),
    )
    .await;
    let clinic_token = app.login("dana@sunrise.test", STRONG_PASSWORD).await;

    let (status, body) = app.get("/api/admin/report/revenue", Some(&clinic_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let admin = User::new(
        "Root Admin",
        "root@platform.test",
        None,
        UserRole::Admin,
        PasswordService::hash(STRONG_PASSWORD).unwrap(),
        None,
    )
    .unwrap();
    UserRepository::create(app.store.as_ref(), &admin).await.unwrap();
    let admin_token = app.login("root@platform.test", STRONG_PASSWORD).await;

    let (status, body) = app.get("/api/admin/crm-migration", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["subscriptionProvider"], "local");

    let (status, body) = app.get("/api/admin/report/revenue", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new(UNUSED_CRM);
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = app.get("/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}
