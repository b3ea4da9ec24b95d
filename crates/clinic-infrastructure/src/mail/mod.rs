//! Mail delivery adapters: SMTP via lettre, and a log-only mailer for
//! development.

pub mod log_mailer;
pub mod smtp;
pub mod templates;

pub use log_mailer::LogMailer;
pub use smtp::SmtpMailer;
pub use templates::{RenderedEmail, TemplateRenderer};
