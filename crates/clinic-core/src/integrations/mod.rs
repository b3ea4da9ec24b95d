//! Ports to outbound integrations (mail delivery, CRM).

pub mod crm;
pub mod mailer;

pub use crm::{CrmClient, CrmContact, CrmError, CrmSubscription, CrmTask, NewCrmContact};
pub use mailer::{EmailKind, MailError, Mailer};

#[cfg(test)]
pub use crm::MockCrmClient;
#[cfg(test)]
pub use mailer::MockMailer;
