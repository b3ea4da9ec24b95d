// ============================================================================
// Clinic API - Admin Handlers
// File: crates/clinic-api/src/handlers/admin.rs
// ============================================================================
//! CRM migration and revenue reporting. Admin role only.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use clinic_core::domain::SubscriptionHistory;
use clinic_core::services::crm_migration_service::ClinicMigrationRow;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRequest {
    pub clinic_id: Option<Uuid>,
    pub action: String,
}

/// GET /api/admin/crm-migration
pub async fn list_migration_candidates(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ClinicMigrationRow>>>, ApiError> {
    let rows = state.migration.list().await?;
    let message = format!("{} clinic(s)", rows.len());
    Ok(Json(ApiResponse::success(rows, message)))
}

fn to_json<T: Serialize>(value: T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

/// POST /api/admin/crm-migration
pub async fn run_migration(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<MigrationRequest>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let clinic_id = || payload.clinic_id.ok_or_else(|| ApiError::BadRequest("clinicId is required".into()));

    let (data, message) = match payload.action.as_str() {
        "migrate" => {
            let result = state.migration.migrate(&clinic_id()?).await?;
            let message = format!("{} migrated to CRM billing", result.clinic_name);
            (to_json(result)?, message)
        }
        "bulk-migrate" => {
            let results = state.migration.bulk_migrate().await?;
            let migrated = results.iter().filter(|r| r.success).count();
            let message = format!("{} of {} clinic(s) migrated", migrated, results.len());
            (to_json(results)?, message)
        }
        "check-status" => {
            let status = state.migration.check_status(&clinic_id()?).await?;
            (to_json(status)?, "Migration status".to_string())
        }
        other => return Err(ApiError::BadRequest(format!("Invalid action: {}", other))),
    };
    Ok(Json(ApiResponse::success(data, message)))
}

/// GET /api/admin/report/revenue
pub async fn revenue_report(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SubscriptionHistory>>>, ApiError> {
    let history = state.repos.subscriptions.list_history().await?;
    let total: f64 = history.iter().map(|h| h.payment_amount).sum();
    let message = format!("{} payment(s), total {:.2}", history.len(), total);
    Ok(Json(ApiResponse::success(history, message)))
}
