// ============================================================================
// Clinic API - Subscription Webhook Handlers
// File: crates/clinic-api/src/handlers/webhooks.rs
// ============================================================================
//! Inbound CRM subscription events and the workflow dry-run endpoints.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use clinic_core::services::event_normalizer::parse_payload;
use clinic_core::services::{WebhookOutcome, WorkflowDescription, WorkflowDispatcher, WorkflowReport};
use clinic_core::{CanonicalEvent, Clinic};
use clinic_core::services::workflow::ActionResult;
use clinic_security::webhook_auth::{verify_bearer, verify_shared_secret, verify_signature};
use clinic_shared::config::WebhookSettings;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

pub const CUSTOM_SECRET_HEADER: &str = "x-custom-secret";
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub trigger: String,
    pub workflow: Option<&'static str>,
    pub actions_executed: Vec<ActionResult>,
    pub errors: Vec<String>,
    pub clinic_id: Uuid,
    pub raw_status: Option<String>,
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunResult {
    pub event: Option<String>,
    pub workflow: Option<WorkflowDescription>,
    pub received_data: Map<String, Value>,
}

impl WebhookAck {
    fn new(clinic: &Clinic, event: CanonicalEvent, report: WorkflowReport) -> Self {
        Self {
            trigger: report.trigger,
            workflow: report.workflow,
            actions_executed: report.executed_actions,
            errors: report.errors,
            clinic_id: clinic.id,
            raw_status: event.raw_status,
            success: report.success,
        }
    }
}

fn configured(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Bearer token or `x-custom-secret`, plus the HMAC signature when a
/// signature secret is configured. With no credential configured every
/// request is rejected.
pub fn authenticate(settings: &WebhookSettings, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let by_bearer = configured(&settings.bearer_token)
        .is_some_and(|expected| verify_bearer(header_str(header::AUTHORIZATION.as_str()), expected));
    let by_secret = configured(&settings.custom_secret)
        .is_some_and(|expected| verify_shared_secret(header_str(CUSTOM_SECRET_HEADER), expected));

    if !by_bearer && !by_secret {
        warn!("Webhook rejected: invalid authorization");
        return Err(ApiError::Unauthorized("Invalid authorization".into()));
    }

    if let Some(secret) = configured(&settings.signature_secret) {
        if !verify_signature(header_str(SIGNATURE_HEADER), secret, body) {
            warn!("Webhook rejected: invalid signature");
            return Err(ApiError::Unauthorized("Invalid signature".into()));
        }
    }
    Ok(())
}

/// POST /api/webhooks/subscription (alias /api/webhooks/crm)
///
/// 200 once the subscription row reflects the event, even if an email or
/// CRM task failed. A failed row write answers 500 so the sender retries.
pub async fn receive_subscription_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    authenticate(&state.config.webhook, &headers, &body)?;

    match state.webhooks.handle_body(&body).await? {
        WebhookOutcome::Processed { clinic, event, report } => {
            info!(
                trigger = %report.trigger,
                clinic_id = %clinic.id,
                success = report.success,
                "Subscription webhook processed"
            );
            let message = report.message.clone();
            Ok(Json(ApiResponse::success(WebhookAck::new(&clinic, event, report), message)).into_response())
        }
        WebhookOutcome::ReconcileFailed { clinic, event, report } => {
            error!(trigger = %report.trigger, clinic_id = %clinic.id, "Subscription webhook not applied");
            let body = ApiResponse::failure_with_data(
                "INTERNAL_ERROR",
                "Subscription state could not be updated",
                WebhookAck::new(&clinic, event, report),
            );
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
        }
        WebhookOutcome::ClinicNotFound { .. } => Err(ApiError::NotFound("Clinic not found".into())),
        WebhookOutcome::Ignored { .. } => Err(ApiError::Unprocessable("Unrecognized subscription status".into())),
    }
}

/// GET /api/webhooks/subscription/workflows
pub async fn list_workflows() -> Json<ApiResponse<Vec<WorkflowDescription>>> {
    Json(ApiResponse::success(
        WorkflowDispatcher::catalog(),
        "Available subscription workflows",
    ))
}

/// POST /api/webhooks/subscription/test
///
/// Reports the workflow an event would run. Nothing is executed.
pub async fn dry_run(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<DryRunResult>>, ApiError> {
    authenticate(&state.config.webhook, &headers, &body)?;

    let payload = parse_payload(&body)?;
    let event = ["event", "type", "action"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::to_string);
    let workflow = event.as_deref().and_then(WorkflowDispatcher::describe);

    let message = match (&workflow, &event) {
        (Some(w), _) => format!("Would execute {} ({} actions)", w.workflow, w.actions.len()),
        (None, Some(e)) => format!("No workflow registered for event '{}'", e),
        (None, None) => "No event name in payload".to_string(),
    };

    Ok(Json(ApiResponse::success(
        DryRunResult {
            event,
            workflow,
            received_data: payload,
        },
        message,
    )))
}
