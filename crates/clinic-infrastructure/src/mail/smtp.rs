// ============================================================================
// Clinic Infrastructure - SMTP Mailer
// File: crates/clinic-infrastructure/src/mail/smtp.rs
// ============================================================================

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::Value;
use tracing::{error, info};

use clinic_core::integrations::{EmailKind, MailError, Mailer};
use clinic_shared::config::MailSettings;
use clinic_shared::utils::mask_email;

use super::templates::TemplateRenderer;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    renderer: TemplateRenderer,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> Result<Self, MailError> {
        let from: Mailbox = settings
            .from_address
            .parse()
            .map_err(|e| MailError::Delivery(format!("invalid from address: {}", e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
            .map_err(|e| MailError::Delivery(e.to_string()))?
            .port(settings.smtp_port);
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            renderer: TemplateRenderer::new()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_template(&self, to: &str, kind: EmailKind, vars: Value) -> Result<(), MailError> {
        let rendered = self.renderer.render(kind, &vars)?;
        let recipient: Mailbox = to
            .parse()
            .map_err(|e| MailError::Delivery(format!("invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(rendered.subject)
            .header(ContentType::TEXT_HTML)
            .body(rendered.html)
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        self.transport.send(message).await.map_err(|e| {
            error!("SMTP delivery of {} to {} failed: {}", kind.template_name(), mask_email(to), e);
            MailError::Delivery(e.to_string())
        })?;

        info!("Sent {} email to {}", kind.template_name(), mask_email(to));
        Ok(())
    }
}
