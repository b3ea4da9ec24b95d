// ============================================================================
// Clinic Core - Subscription Reconciler
// File: crates/clinic-core/src/services/subscription_reconciler.rs
// Description: Applies a canonical trigger to a clinic's subscription row
// ============================================================================
//! State machine over `SubscriptionTier.is_active`.
//!
//! | trigger        | row exists | effect                                            |
//! |----------------|------------|---------------------------------------------------|
//! | activated      | no         | insert active row, end = start + one term         |
//! | activated      | yes        | update plan, ids, dates in place, set active      |
//! | cancelled      | yes        | inactive, end = event end or now                  |
//! | cancelled      | no         | no-op                                             |
//! | renewed        | yes        | end = max(now, start) + one term, active, ledger  |
//! | renewed        | no         | no-op                                             |
//! | payment_failed | any        | logged only                                       |

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use clinic_shared::constants::BILLING_TERM_DAYS;

use super::coercion::{parse_amount, parse_date};
use super::status_mapper::SubscriptionTrigger;
use crate::domain::{CanonicalEvent, Clinic, SubscriptionHistory, SubscriptionProvider, SubscriptionTier};
use crate::error::DomainError;
use crate::repositories::SubscriptionRepository;

/// Plan recorded when an activation carries no plan id and there is no prior row.
pub const FALLBACK_PLAN_ID: &str = "basic_plan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    Created,
    Updated,
    Deactivated,
    Renewed,
    PaymentFailureLogged,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub action: ReconcileAction,
    pub subscription: Option<SubscriptionTier>,
    pub history: Option<SubscriptionHistory>,
}

impl ReconcileOutcome {
    fn new(action: ReconcileAction, subscription: Option<SubscriptionTier>) -> Self {
        Self {
            action,
            subscription,
            history: None,
        }
    }
}

fn term() -> Duration {
    Duration::days(BILLING_TERM_DAYS)
}

pub struct SubscriptionReconciler {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl SubscriptionReconciler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    pub async fn reconcile(
        &self,
        trigger: SubscriptionTrigger,
        event: &CanonicalEvent,
        clinic: &Clinic,
    ) -> Result<ReconcileOutcome, DomainError> {
        self.reconcile_at(trigger, event, clinic, Utc::now()).await
    }

    pub async fn reconcile_at(
        &self,
        trigger: SubscriptionTrigger,
        event: &CanonicalEvent,
        clinic: &Clinic,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, DomainError> {
        match trigger {
            SubscriptionTrigger::Activated => self.activate(event, clinic, now).await,
            SubscriptionTrigger::Cancelled => self.cancel(event, clinic, now).await,
            SubscriptionTrigger::Renewed => self.renew(event, clinic, now).await,
            SubscriptionTrigger::PaymentFailed => self.log_payment_failure(event, clinic).await,
        }
    }

    async fn activate(
        &self,
        event: &CanonicalEvent,
        clinic: &Clinic,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, DomainError> {
        let start = parse_date(event.start_date.as_deref()).unwrap_or(now);
        let end = parse_date(event.end_date.as_deref()).unwrap_or(start + term());
        let contact_id = event
            .customer_id
            .clone()
            .filter(|c| !c.is_empty())
            .or_else(|| clinic.crm_contact_id.clone());

        // 1. Insert; the unique clinic constraint decides whether a row exists
        let fresh = SubscriptionTier {
            plan_id: event
                .plan_id
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| FALLBACK_PLAN_ID.to_string()),
            subscription_id: event.subscription_id.clone(),
            crm_contact_id: contact_id.clone(),
            is_active: true,
            start_date: Some(start),
            end_date: Some(end),
            provider: SubscriptionProvider::Crm,
            ..SubscriptionTier::inactive(clinic.id, FALLBACK_PLAN_ID, now)
        };

        let (action, tier) = match self.subscriptions.insert(&fresh).await {
            Ok(created) => {
                info!(clinic_id = %clinic.id, subscription = %created.id, "Subscription created");
                (ReconcileAction::Created, created)
            }
            Err(DomainError::SubscriptionAlreadyExists(_)) => {
                // 2. Existing row: update in place
                let mut existing = self
                    .subscriptions
                    .find_latest_by_clinic(&clinic.id)
                    .await?
                    .ok_or(DomainError::SubscriptionNotFound)?;
                if let Some(plan) = event.plan_id.clone().filter(|p| !p.is_empty()) {
                    existing.plan_id = plan;
                }
                if event.subscription_id.is_some() {
                    existing.subscription_id = event.subscription_id.clone();
                }
                if contact_id.is_some() {
                    existing.crm_contact_id = contact_id;
                }
                existing.is_active = true;
                existing.start_date = Some(start);
                existing.end_date = Some(end);
                existing.provider = SubscriptionProvider::Crm;
                existing.updated_at = now;
                let updated = self.subscriptions.update(&existing).await?;
                info!(clinic_id = %clinic.id, subscription = %updated.id, "Subscription re-activated");
                (ReconcileAction::Updated, updated)
            }
            Err(e) => return Err(e),
        };

        // 3. Ledger
        let history = self.record_payment(event, clinic, &tier, now).await?;
        Ok(ReconcileOutcome {
            action,
            subscription: Some(tier),
            history,
        })
    }

    async fn cancel(
        &self,
        event: &CanonicalEvent,
        clinic: &Clinic,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, DomainError> {
        let Some(mut tier) = self.subscriptions.find_latest_by_clinic(&clinic.id).await? else {
            warn!(clinic_id = %clinic.id, "Cancellation for clinic without subscription, nothing to do");
            return Ok(ReconcileOutcome::new(ReconcileAction::NotFound, None));
        };

        tier.is_active = false;
        tier.end_date = Some(parse_date(event.end_date.as_deref()).unwrap_or(now));
        tier.updated_at = now;
        let updated = self.subscriptions.update(&tier).await?;
        info!(clinic_id = %clinic.id, subscription = %updated.id, "Subscription deactivated");
        Ok(ReconcileOutcome::new(ReconcileAction::Deactivated, Some(updated)))
    }

    async fn renew(
        &self,
        event: &CanonicalEvent,
        clinic: &Clinic,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, DomainError> {
        let Some(mut tier) = self.subscriptions.find_latest_by_clinic(&clinic.id).await? else {
            warn!(clinic_id = %clinic.id, "Renewal for clinic without subscription, nothing to do");
            return Ok(ReconcileOutcome::new(ReconcileAction::NotFound, None));
        };

        let anchor = parse_date(event.start_date.as_deref()).map_or(now, |start| start.max(now));
        tier.end_date = Some(anchor + term());
        tier.is_active = true;
        if event.subscription_id.is_some() {
            tier.subscription_id = event.subscription_id.clone();
        }
        tier.updated_at = now;
        let updated = self.subscriptions.update(&tier).await?;
        info!(clinic_id = %clinic.id, subscription = %updated.id, "Subscription renewed");

        let history = self.record_payment(event, clinic, &updated, now).await?;
        Ok(ReconcileOutcome {
            action: ReconcileAction::Renewed,
            subscription: Some(updated),
            history,
        })
    }

    async fn log_payment_failure(
        &self,
        event: &CanonicalEvent,
        clinic: &Clinic,
    ) -> Result<ReconcileOutcome, DomainError> {
        warn!(
            clinic_id = %clinic.id,
            failure_reason = event.failure_reason.as_deref().unwrap_or("unknown"),
            subscription_id = ?event.subscription_id,
            "Subscription payment failed"
        );
        let current = self.subscriptions.find_latest_by_clinic(&clinic.id).await?;
        Ok(ReconcileOutcome::new(ReconcileAction::PaymentFailureLogged, current))
    }

    /// Ledger row for the event's amount; skipped when the amount is absent
    /// or unparseable.
    async fn record_payment(
        &self,
        event: &CanonicalEvent,
        clinic: &Clinic,
        tier: &SubscriptionTier,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionHistory>, DomainError> {
        let Some(amount) = parse_amount(event.amount.as_deref()) else {
            return Ok(None);
        };
        let history = self
            .subscriptions
            .create_history_once(&SubscriptionHistory::new(clinic.id, tier.id, amount, now))
            .await?;
        Ok(Some(history))
    }
}
