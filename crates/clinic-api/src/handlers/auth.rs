// ============================================================================
// Clinic API - Auth Handlers
// File: crates/clinic-api/src/handlers/auth.rs
// ============================================================================
//! Login, logout, session refresh and the subscription check

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;

use clinic_core::services::{SessionResult, SubscriptionStatus};
use clinic_security::SessionClaims;
use clinic_shared::constants::{SESSION_COOKIE_NAME, SUBSCRIPTION_INACTIVE_ERROR};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignoutQuery {
    pub error: Option<String>,
    pub message: Option<String>,
}

fn session_cookie(token: &str, max_age_secs: i64) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE_NAME,
        token,
        max_age_secs.max(0)
    ))
    .map_err(|e| ApiError::Internal(format!("invalid session cookie: {}", e)))
}

fn session_response(session: SessionResult, message: &str, ttl_secs: i64) -> Result<Response, ApiError> {
    let cookie = session_cookie(&session.token, ttl_secs)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(session, message)),
    )
        .into_response())
}

/// Login handler - POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".into()));
    }
    let session = state.auth.login(&payload.email, &payload.password).await?;
    session_response(session, "Login successful", state.config.jwt.session_ttl_secs)
}

/// Logout handler - POST /api/auth/logout
pub async fn logout() -> Result<Response, ApiError> {
    let cookie = session_cookie("", 0)?;
    Ok(([(header::SET_COOKIE, cookie)], Json(ApiResponse::message("Logged out successfully"))).into_response())
}

/// Refresh handler - POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Response, ApiError> {
    let session = state.auth.refresh(&claims).await?;
    session_response(session, "Session refreshed", state.config.jwt.session_ttl_secs)
}

/// GET /api/auth/check-subscription
pub async fn check_subscription(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<ApiResponse<SubscriptionStatus>>, ApiError> {
    let user = state.auth.user_from_claims(&claims).await?;
    let status = state.auth.check_subscription(&user).await?;
    let message = status.message.clone();
    Ok(Json(ApiResponse::success(status, message)))
}

/// GET /api/auth/subscription-signout
///
/// Clears the session cookie and sends the browser to the login page with
/// the reason attached.
pub async fn subscription_signout(Query(query): Query<SignoutQuery>) -> Result<Response, ApiError> {
    let error = query.error.unwrap_or_else(|| SUBSCRIPTION_INACTIVE_ERROR.to_string());
    let mut params = vec![("error", error)];
    if let Some(message) = query.message {
        params.push(("message", message));
    }
    let query = serde_urlencoded::to_string(&params).map_err(|e| ApiError::Internal(e.to_string()))?;
    let location = HeaderValue::from_str(&format!("/login?{}", query))
        .map_err(|e| ApiError::Internal(format!("invalid redirect location: {}", e)))?;

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, location), (header::SET_COOKIE, session_cookie("", 0)?)],
    )
        .into_response())
}
