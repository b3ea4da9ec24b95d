//! Mailer port

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("Mail template error: {0}")]
    Template(String),
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Templated messages the platform sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Welcome,
    Cancellation,
    PaymentReminder,
    RenewalConfirmation,
    CoachCredentials,
}

impl EmailKind {
    /// Template name, also used as the file stem of the template source.
    pub fn template_name(&self) -> &'static str {
        match self {
            EmailKind::Welcome => "welcome",
            EmailKind::Cancellation => "cancellation",
            EmailKind::PaymentReminder => "payment_reminder",
            EmailKind::RenewalConfirmation => "renewal_confirmation",
            EmailKind::CoachCredentials => "coach_credentials",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            EmailKind::Welcome => "Welcome to Client Health Tracker",
            EmailKind::Cancellation => "Your subscription has been cancelled",
            EmailKind::PaymentReminder => "Action needed: payment failed",
            EmailKind::RenewalConfirmation => "Your subscription has been renewed",
            EmailKind::CoachCredentials => "Your coach account credentials",
        }
    }

    pub fn all() -> [EmailKind; 5] {
        [
            EmailKind::Welcome,
            EmailKind::Cancellation,
            EmailKind::PaymentReminder,
            EmailKind::RenewalConfirmation,
            EmailKind::CoachCredentials,
        ]
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_template(
        &self,
        to: &str,
        kind: EmailKind,
        vars: serde_json::Value,
    ) -> Result<(), MailError>;
}
