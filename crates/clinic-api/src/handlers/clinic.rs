use axum::{extract::State, Extension, Json};
use serde::Serialize;

use clinic_core::domain::{Clinic, SubscriptionTier};
use clinic_core::error::DomainError;
use clinic_core::services::UserInfo;
use clinic_security::SessionClaims;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicWorkspace {
    pub clinic: Clinic,
    pub subscription: Option<SubscriptionTier>,
    pub members: Vec<UserInfo>,
}

/// GET /api/clinic
///
/// The session user's clinic, its subscription row and its members. Sits
/// behind the subscription guard.
pub async fn get_workspace(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<ApiResponse<ClinicWorkspace>>, ApiError> {
    let user = state.auth.user_from_claims(&claims).await?;
    let clinic_id = user.clinic_id.ok_or(DomainError::ClinicNotFound)?;

    let clinic = state
        .repos
        .clinics
        .find_by_id(&clinic_id)
        .await?
        .ok_or(DomainError::ClinicNotFound)?;
    let subscription = state.repos.subscriptions.find_latest_by_clinic(&clinic_id).await?;
    let members = state
        .repos
        .users
        .list_by_clinic(&clinic_id)
        .await?
        .iter()
        .map(UserInfo::from)
        .collect();

    Ok(Json(ApiResponse::success(
        ClinicWorkspace {
            clinic,
            subscription,
            members,
        },
        "Clinic workspace",
    )))
}
