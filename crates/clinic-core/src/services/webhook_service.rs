// ============================================================================
// Clinic Core - Subscription Webhook Pipeline
// File: crates/clinic-core/src/services/webhook_service.rs
// ============================================================================
//! body → normalize → map status → resolve clinic → dispatch workflow

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use clinic_shared::config::UnknownStatusPolicy;
use clinic_shared::utils::mask_email;

use super::clinic_resolver::ClinicResolver;
use super::event_normalizer::{normalize, parse_payload};
use super::status_mapper::{resolve_status, SubscriptionTrigger};
use super::workflow::{WorkflowContext, WorkflowDispatcher, WorkflowReport};
use crate::domain::{CanonicalEvent, Clinic};
use crate::error::DomainError;

#[derive(Debug)]
pub enum WebhookOutcome {
    Processed {
        clinic: Clinic,
        event: CanonicalEvent,
        report: WorkflowReport,
    },
    /// No clinic matched and the trigger may not create one. Nothing was written.
    ClinicNotFound {
        trigger: SubscriptionTrigger,
        event: CanonicalEvent,
    },
    /// The workflow ran but the subscription row was not written. The sender
    /// should redeliver; history rows are idempotent per subscription id.
    ReconcileFailed {
        clinic: Clinic,
        event: CanonicalEvent,
        report: WorkflowReport,
    },
    /// Unrecognized status under the `ignore` policy. Nothing was written.
    Ignored { event: CanonicalEvent },
}

pub struct WebhookService {
    resolver: Arc<ClinicResolver>,
    dispatcher: Arc<WorkflowDispatcher>,
    unknown_status: UnknownStatusPolicy,
}

impl WebhookService {
    pub fn new(
        resolver: Arc<ClinicResolver>,
        dispatcher: Arc<WorkflowDispatcher>,
        unknown_status: UnknownStatusPolicy,
    ) -> Self {
        Self {
            resolver,
            dispatcher,
            unknown_status,
        }
    }

    pub async fn handle_body(&self, body: &[u8]) -> Result<WebhookOutcome, DomainError> {
        let payload = parse_payload(body)?;
        self.handle_event(normalize(&payload), Utc::now()).await
    }

    pub async fn handle_event(
        &self,
        event: CanonicalEvent,
        received_at: DateTime<Utc>,
    ) -> Result<WebhookOutcome, DomainError> {
        // 1. Map status
        let resolution = resolve_status(event.raw_status.as_deref());
        if !resolution.recognized && self.unknown_status == UnknownStatusPolicy::Ignore {
            warn!(raw_status = ?event.raw_status, "Ignoring webhook with unrecognized status");
            return Ok(WebhookOutcome::Ignored { event });
        }
        let trigger = resolution.trigger;

        // 2. Resolve clinic; only activation may create one
        let clinic = match trigger {
            SubscriptionTrigger::Activated => self.resolver.resolve_or_create(&event).await?,
            _ => self.resolver.resolve(&event).await?,
        };
        let Some(clinic) = clinic else {
            warn!(
                trigger = trigger.as_str(),
                email = %event.customer_email.as_deref().map(mask_email).unwrap_or_default(),
                customer_id = ?event.customer_id,
                "Clinic not found for subscription webhook"
            );
            return Ok(WebhookOutcome::ClinicNotFound { trigger, event });
        };

        // 3. Dispatch
        info!(trigger = trigger.as_str(), clinic_id = %clinic.id, "Dispatching subscription workflow");
        let ctx = WorkflowContext {
            clinic,
            received_at,
        };
        let report = self.dispatcher.dispatch(trigger.as_str(), &event, &ctx).await;
        if let Some(reason) = report.reconcile_error.as_deref() {
            error!(
                trigger = trigger.as_str(),
                clinic_id = %ctx.clinic.id,
                error = reason,
                "Subscription state was not updated"
            );
            return Ok(WebhookOutcome::ReconcileFailed {
                clinic: ctx.clinic,
                event,
                report,
            });
        }
        Ok(WebhookOutcome::Processed {
            clinic: ctx.clinic,
            event,
            report,
        })
    }
}
