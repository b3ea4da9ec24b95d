// ============================================================================
// Clinic API - Clinic Subscription Handlers
// File: crates/clinic-api/src/handlers/subscription.rs
// ============================================================================

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use clinic_core::error::DomainError;
use clinic_core::services::{BillingAction, BillingOutcome, SubscriptionOverview};
use clinic_security::SessionClaims;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionChangeRequest {
    pub plan_id: Option<String>,
    pub action: Option<String>,
}

async fn session_clinic_id(state: &AppState, claims: &SessionClaims) -> Result<Uuid, ApiError> {
    let user = state.auth.user_from_claims(claims).await?;
    user.clinic_id.ok_or_else(|| DomainError::ClinicNotFound.into())
}

/// GET /api/subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<ApiResponse<SubscriptionOverview>>, ApiError> {
    let clinic_id = session_clinic_id(&state, &claims).await?;
    let overview = state.billing.overview(&clinic_id).await?;
    Ok(Json(ApiResponse::success(overview, "Subscription details")))
}

/// POST /api/subscription
pub async fn change_subscription(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    JsonBody(payload): JsonBody<SubscriptionChangeRequest>,
) -> Result<Json<ApiResponse<BillingOutcome>>, ApiError> {
    let (Some(action), Some(plan_id)) = (payload.action.as_deref(), payload.plan_id.as_deref()) else {
        return Err(ApiError::BadRequest("Missing required fields".into()));
    };
    let action = action
        .parse::<BillingAction>()
        .map_err(|_| ApiError::BadRequest("Invalid action".into()))?;

    let clinic_id = session_clinic_id(&state, &claims).await?;
    let outcome = state.billing.apply(&clinic_id, plan_id, action).await?;
    let message = outcome.message.clone();
    Ok(Json(ApiResponse::success(outcome, message)))
}
