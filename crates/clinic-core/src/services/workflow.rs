// ============================================================================
// Clinic Core - Workflow Dispatcher
// File: crates/clinic-core/src/services/workflow.rs
// Description: Static trigger → ordered action table, executed best-effort
// ============================================================================
//! Each trigger owns an ordered list of actions. Actions run sequentially in
//! declared order; a failing action is recorded and the next one still runs.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use clinic_shared::utils::mask_email;

use super::status_mapper::SubscriptionTrigger;
use super::subscription_reconciler::SubscriptionReconciler;
use crate::domain::{CanonicalEvent, Clinic};
use crate::error::DomainError;
use crate::integrations::{CrmClient, CrmTask, EmailKind, Mailer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    ActivateSubscription,
    SendWelcomeEmail,
    CreateOnboardingTasks,
    DeactivateSubscription,
    SendCancellationEmail,
    CreateRetentionTasks,
    LogPaymentFailure,
    SendPaymentReminder,
    CreatePaymentRecoveryTasks,
    UpdateSubscription,
    SendRenewalConfirmation,
    UpdateBillingRecords,
}

impl WorkflowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowAction::ActivateSubscription => "activate_subscription",
            WorkflowAction::SendWelcomeEmail => "send_welcome_email",
            WorkflowAction::CreateOnboardingTasks => "create_onboarding_tasks",
            WorkflowAction::DeactivateSubscription => "deactivate_subscription",
            WorkflowAction::SendCancellationEmail => "send_cancellation_email",
            WorkflowAction::CreateRetentionTasks => "create_retention_tasks",
            WorkflowAction::LogPaymentFailure => "log_payment_failure",
            WorkflowAction::SendPaymentReminder => "send_payment_reminder",
            WorkflowAction::CreatePaymentRecoveryTasks => "create_payment_recovery_tasks",
            WorkflowAction::UpdateSubscription => "update_subscription",
            WorkflowAction::SendRenewalConfirmation => "send_renewal_confirmation",
            WorkflowAction::UpdateBillingRecords => "update_billing_records",
        }
    }

    /// Actions that write the subscription row. Their failure means the
    /// event was not applied and the sender should redeliver.
    pub fn reconciles(&self) -> bool {
        matches!(
            self,
            WorkflowAction::ActivateSubscription
                | WorkflowAction::DeactivateSubscription
                | WorkflowAction::LogPaymentFailure
                | WorkflowAction::UpdateSubscription
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            WorkflowAction::ActivateSubscription => "Create or re-activate the clinic subscription",
            WorkflowAction::SendWelcomeEmail => "Email the clinic a welcome message",
            WorkflowAction::CreateOnboardingTasks => "Create a CRM onboarding task",
            WorkflowAction::DeactivateSubscription => "Deactivate the clinic subscription",
            WorkflowAction::SendCancellationEmail => "Email the clinic a cancellation notice",
            WorkflowAction::CreateRetentionTasks => "Create a CRM retention follow-up task",
            WorkflowAction::LogPaymentFailure => "Record the failed payment",
            WorkflowAction::SendPaymentReminder => "Email the clinic a payment reminder",
            WorkflowAction::CreatePaymentRecoveryTasks => "Create a CRM payment recovery task",
            WorkflowAction::UpdateSubscription => "Extend the subscription by one term",
            WorkflowAction::SendRenewalConfirmation => "Email the clinic a renewal confirmation",
            WorkflowAction::UpdateBillingRecords => "Update billing fields on the CRM contact",
        }
    }
}

#[derive(Debug)]
pub struct Workflow {
    pub trigger: SubscriptionTrigger,
    pub name: &'static str,
    pub actions: &'static [WorkflowAction],
}

pub static WORKFLOWS: &[Workflow] = &[
    Workflow {
        trigger: SubscriptionTrigger::Activated,
        name: "Subscription Activation Workflow",
        actions: &[
            WorkflowAction::ActivateSubscription,
            WorkflowAction::SendWelcomeEmail,
            WorkflowAction::CreateOnboardingTasks,
        ],
    },
    Workflow {
        trigger: SubscriptionTrigger::Cancelled,
        name: "Subscription Cancellation Workflow",
        actions: &[
            WorkflowAction::DeactivateSubscription,
            WorkflowAction::SendCancellationEmail,
            WorkflowAction::CreateRetentionTasks,
        ],
    },
    Workflow {
        trigger: SubscriptionTrigger::PaymentFailed,
        name: "Payment Failure Workflow",
        actions: &[
            WorkflowAction::LogPaymentFailure,
            WorkflowAction::SendPaymentReminder,
            WorkflowAction::CreatePaymentRecoveryTasks,
        ],
    },
    Workflow {
        trigger: SubscriptionTrigger::Renewed,
        name: "Subscription Renewal Workflow",
        actions: &[
            WorkflowAction::UpdateSubscription,
            WorkflowAction::SendRenewalConfirmation,
            WorkflowAction::UpdateBillingRecords,
        ],
    },
];

pub fn find_workflow(trigger: &str) -> Option<&'static Workflow> {
    WORKFLOWS.iter().find(|w| w.trigger.as_str() == trigger)
}

#[derive(Debug, Clone)]
pub struct WorkflowContext {
    pub clinic: Clinic,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub name: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowReport {
    pub trigger: String,
    pub workflow: Option<&'static str>,
    pub message: String,
    pub executed_actions: Vec<ActionResult>,
    pub errors: Vec<String>,
    pub success: bool,
    /// Set when the subscription state action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDescription {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowDescription {
    pub trigger: &'static str,
    pub workflow: &'static str,
    pub actions: Vec<ActionDescription>,
}

impl From<&Workflow> for WorkflowDescription {
    fn from(w: &Workflow) -> Self {
        Self {
            trigger: w.trigger.as_str(),
            workflow: w.name,
            actions: w
                .actions
                .iter()
                .map(|a| ActionDescription {
                    name: a.as_str(),
                    description: a.description(),
                })
                .collect(),
        }
    }
}

pub struct WorkflowDispatcher {
    reconciler: Arc<SubscriptionReconciler>,
    mailer: Arc<dyn Mailer>,
    crm: Arc<dyn CrmClient>,
}

impl WorkflowDispatcher {
    pub fn new(
        reconciler: Arc<SubscriptionReconciler>,
        mailer: Arc<dyn Mailer>,
        crm: Arc<dyn CrmClient>,
    ) -> Self {
        Self {
            reconciler,
            mailer,
            crm,
        }
    }

    /// Dry run: the workflow a trigger would execute.
    pub fn describe(trigger: &str) -> Option<WorkflowDescription> {
        find_workflow(trigger).map(WorkflowDescription::from)
    }

    pub fn catalog() -> Vec<WorkflowDescription> {
        WORKFLOWS.iter().map(WorkflowDescription::from).collect()
    }

    pub async fn dispatch(
        &self,
        trigger: &str,
        event: &CanonicalEvent,
        ctx: &WorkflowContext,
    ) -> WorkflowReport {
        let started_at = Utc::now();

        let Some(workflow) = find_workflow(trigger) else {
            warn!(trigger, "No workflow registered for trigger");
            return WorkflowReport {
                trigger: trigger.to_string(),
                workflow: None,
                message: format!("No workflow registered for trigger '{}'", trigger),
                executed_actions: Vec::new(),
                errors: Vec::new(),
                success: false,
                reconcile_error: None,
                started_at,
                finished_at: Utc::now(),
            };
        };

        let mut executed_actions = Vec::with_capacity(workflow.actions.len());
        let mut errors = Vec::new();
        let mut reconcile_error = None;

        for action in workflow.actions {
            match self.execute(*action, workflow.trigger, event, ctx).await {
                Ok(result) => {
                    info!(workflow = workflow.name, action = action.as_str(), "Workflow action succeeded");
                    executed_actions.push(ActionResult {
                        name: action.as_str(),
                        success: true,
                        result: Some(result),
                        error: None,
                    });
                }
                Err(e) => {
                    error!(workflow = workflow.name, action = action.as_str(), error = %e, "Workflow action failed");
                    errors.push(format!("{}: {}", action.as_str(), e));
                    if action.reconciles() {
                        reconcile_error = Some(e.to_string());
                    }
                    executed_actions.push(ActionResult {
                        name: action.as_str(),
                        success: false,
                        result: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let success = errors.is_empty();
        info!(
            trigger = workflow.trigger.as_str(),
            workflow = workflow.name,
            actions_executed = executed_actions.len(),
            error_count = errors.len(),
            clinic_id = %ctx.clinic.id,
            "Workflow finished"
        );

        WorkflowReport {
            trigger: workflow.trigger.as_str().to_string(),
            workflow: Some(workflow.name),
            message: if success {
                format!("{} completed", workflow.name)
            } else {
                format!("{} completed with {} error(s)", workflow.name, errors.len())
            },
            executed_actions,
            errors,
            success,
            reconcile_error,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn execute(
        &self,
        action: WorkflowAction,
        trigger: SubscriptionTrigger,
        event: &CanonicalEvent,
        ctx: &WorkflowContext,
    ) -> Result<Value, DomainError> {
        match action {
            WorkflowAction::ActivateSubscription
            | WorkflowAction::DeactivateSubscription
            | WorkflowAction::LogPaymentFailure
            | WorkflowAction::UpdateSubscription => {
                let outcome = self
                    .reconciler
                    .reconcile_at(trigger, event, &ctx.clinic, ctx.received_at)
                    .await?;
                serde_json::to_value(&outcome).map_err(|e| DomainError::InternalError(e.to_string()))
            }
            WorkflowAction::SendWelcomeEmail => self.send_email(EmailKind::Welcome, event, ctx).await,
            WorkflowAction::SendCancellationEmail => self.send_email(EmailKind::Cancellation, event, ctx).await,
            WorkflowAction::SendPaymentReminder => self.send_email(EmailKind::PaymentReminder, event, ctx).await,
            WorkflowAction::SendRenewalConfirmation => {
                self.send_email(EmailKind::RenewalConfirmation, event, ctx).await
            }
            WorkflowAction::CreateOnboardingTasks => {
                self.create_task(ctx, "Onboard new clinic", "Schedule the onboarding call and account walkthrough.", 1)
                    .await
            }
            WorkflowAction::CreateRetentionTasks => {
                self.create_task(ctx, "Retention follow-up", "Reach out to understand the cancellation and offer options.", 2)
                    .await
            }
            WorkflowAction::CreatePaymentRecoveryTasks => {
                let reason = event.failure_reason.as_deref().unwrap_or("unknown");
                let body = format!("Payment failed ({}). Help the clinic update their billing details.", reason);
                self.create_task(ctx, "Payment recovery", &body, 1).await
            }
            WorkflowAction::UpdateBillingRecords => self.update_billing_records(event, ctx).await,
        }
    }

    async fn send_email(
        &self,
        kind: EmailKind,
        event: &CanonicalEvent,
        ctx: &WorkflowContext,
    ) -> Result<Value, DomainError> {
        let vars = json!({
            "clinic_name": ctx.clinic.name,
            "contact_name": ctx.clinic.primary_contact.as_deref().unwrap_or(&ctx.clinic.name),
            "plan_id": event.plan_id,
            "amount": event.amount,
            "end_date": event.end_date,
            "failure_reason": event.failure_reason,
        });
        self.mailer.send_template(&ctx.clinic.email, kind, vars).await?;
        Ok(json!({ "template": kind.template_name(), "to": mask_email(&ctx.clinic.email) }))
    }

    async fn create_task(
        &self,
        ctx: &WorkflowContext,
        title: &str,
        body: &str,
        due_in_days: i64,
    ) -> Result<Value, DomainError> {
        let Some(contact_id) = ctx.clinic.crm_contact_id.as_deref().filter(|c| !c.is_empty()) else {
            return Ok(json!({ "skipped": true, "reason": "clinic has no CRM contact" }));
        };
        let task = CrmTask {
            title: format!("{}: {}", title, ctx.clinic.name),
            body: body.to_string(),
            due_date: ctx.received_at + Duration::days(due_in_days),
        };
        self.crm.create_task(contact_id, &task).await?;
        Ok(json!({ "task": task.title, "contactId": contact_id }))
    }

    async fn update_billing_records(
        &self,
        event: &CanonicalEvent,
        ctx: &WorkflowContext,
    ) -> Result<Value, DomainError> {
        let Some(contact_id) = ctx.clinic.crm_contact_id.as_deref().filter(|c| !c.is_empty()) else {
            return Ok(json!({ "skipped": true, "reason": "clinic has no CRM contact" }));
        };
        let fields = json!({
            "tags": ["subscription-renewed"],
            "customField": {
                "subscription_status": "active",
                "last_payment_amount": event.amount,
                "last_renewed_at": ctx.received_at.to_rfc3339(),
            }
        });
        let contact = self.crm.update_contact(contact_id, fields).await?;
        Ok(json!({ "contactId": contact.id }))
    }
}
