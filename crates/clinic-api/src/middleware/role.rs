//! Role guards. Must run after `require_session`.

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::warn;

use clinic_core::domain::UserRole;
use clinic_security::SessionClaims;

use crate::error::ApiError;

fn ensure_role(request: &Request, allowed: &[UserRole]) -> Result<(), ApiError> {
    let claims = request
        .extensions()
        .get::<SessionClaims>()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;

    if allowed.iter().any(|role| role.as_str() == claims.role) {
        return Ok(());
    }
    warn!(user_id = %claims.sub, role = %claims.role, path = request.uri().path(), "Role not permitted");
    Err(ApiError::Forbidden("Insufficient permissions".into()))
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    ensure_role(&request, &[UserRole::Admin])?;
    Ok(next.run(request).await)
}

pub async fn require_clinic_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    ensure_role(&request, &[UserRole::ClinicAdmin])?;
    Ok(next.run(request).await)
}
