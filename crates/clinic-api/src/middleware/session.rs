// ============================================================================
// Clinic API - Session Guard
// File: crates/clinic-api/src/middleware/session.rs
// ============================================================================
//! Authenticates the session token and enforces the subscription flag it
//! carries.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};

use clinic_core::domain::UserRole;
use clinic_security::SessionClaims;
use clinic_shared::constants::{SESSION_COOKIE_NAME, SUBSCRIPTION_INACTIVE_ERROR};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

const DEFAULT_INACTIVE_MESSAGE: &str = "Your clinic subscription is inactive";

/// Bearer token first, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.to_string())
        .filter(|t| !t.is_empty())
}

/// 401 unless the request carries a valid session token. The decoded
/// `SessionClaims` are added to the request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;
    let claims = state.auth.validate_token(&token)?;
    debug!(user_id = %claims.sub, role = %claims.role, "Session authenticated");

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Must run after `require_session`. Non-admin sessions whose subscription
/// flag is false are sent back to the login page: API paths get a 401 with
/// `redirectTo`, other paths a 302.
pub async fn require_active_subscription(request: Request, next: Next) -> Result<Response, ApiError> {
    let claims = request
        .extensions()
        .get::<SessionClaims>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;

    if claims.subscription_valid || claims.role == UserRole::Admin.as_str() {
        return Ok(next.run(request).await);
    }

    let message = claims
        .subscription_message
        .as_deref()
        .unwrap_or(DEFAULT_INACTIVE_MESSAGE);
    let redirect_to = login_redirect(message);
    let path = request.uri().path();
    warn!(user_id = %claims.sub, path, "Blocked session with inactive subscription");

    if path.starts_with("/api") {
        let body = ApiResponse::failure_with_data(
            SUBSCRIPTION_INACTIVE_ERROR,
            message,
            json!({ "redirectTo": redirect_to }),
        );
        return Ok((StatusCode::UNAUTHORIZED, Json(body)).into_response());
    }

    let location = HeaderValue::from_str(&redirect_to)
        .map_err(|e| ApiError::Internal(format!("invalid redirect location: {}", e)))?;
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

fn login_redirect(message: &str) -> String {
    let query = serde_urlencoded::to_string([("error", SUBSCRIPTION_INACTIVE_ERROR), ("message", message)])
        .unwrap_or_else(|_| format!("error={}", SUBSCRIPTION_INACTIVE_ERROR));
    format!("/login?{}", query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn claims(role: &str, valid: bool) -> SessionClaims {
        SessionClaims {
            sub: "u-1".into(),
            name: "Dana".into(),
            email: "dana@x.com".into(),
            role: role.into(),
            subscription_valid: valid,
            subscription_message: Some("Subscription is inactive".into()),
            iat: 0,
            exp: i64::MAX,
        }
    }

    fn guarded(claims: SessionClaims) -> Router {
        Router::new()
            .route("/api/clinic", get(|| async { "ok" }))
            .route("/clinic/dashboard", get(|| async { "ok" }))
            .layer(middleware::from_fn(require_active_subscription))
            .layer(middleware::from_fn(move |mut req: Request, next: Next| {
                let claims = claims.clone();
                async move {
                    req.extensions_mut().insert(claims);
                    next.run(req).await
                }
            }))
    }

    #[test]
    fn test_session_token_sources() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session_token=abc"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));

        assert!(session_token(&HeaderMap::new()).is_none());
    }

    #[tokio::test]
    async fn test_inactive_api_request_gets_401_with_redirect() {
        let response = guarded(claims("clinic_admin", false))
            .oneshot(Request::builder().uri("/api/clinic").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        let redirect = body["data"]["redirectTo"].as_str().unwrap();
        assert!(redirect.starts_with("/login?error=subscription_inactive&message="));
    }

    #[tokio::test]
    async fn test_inactive_page_request_is_redirected() {
        let response = guarded(claims("coach", false))
            .oneshot(Request::builder().uri("/clinic/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.contains("error=subscription_inactive"));
    }

    #[tokio::test]
    async fn test_admin_and_active_sessions_pass() {
        for c in [claims("admin", false), claims("clinic_admin", true)] {
            let response = guarded(c)
                .oneshot(Request::builder().uri("/api/clinic").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
