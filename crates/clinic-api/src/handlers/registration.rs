use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use clinic_core::services::registration_service::SkippedCoach;
use clinic_core::services::ClinicRegistration;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub url: String,
    pub clinic_id: String,
    pub payment_link: String,
    pub coaches_created: Vec<String>,
    pub coaches_skipped: Vec<SkippedCoach>,
}

/// POST /api/auth/clinic-register
pub async fn register_clinic(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ClinicRegistration>,
) -> Result<(StatusCode, Json<ApiResponse<RegistrationResponse>>), ApiError> {
    let result = state.registration.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            RegistrationResponse {
                url: "/login".into(),
                clinic_id: result.clinic_id.to_string(),
                payment_link: result.payment_link,
                coaches_created: result.coaches_created,
                coaches_skipped: result.coaches_skipped,
            },
            "Clinic registered successfully",
        )),
    ))
}
