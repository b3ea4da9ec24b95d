use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use clinic_core::integrations::{EmailKind, MailError, Mailer};
use clinic_shared::utils::mask_email;

use super::templates::TemplateRenderer;

/// Renders the template and logs it instead of delivering. Used when
/// `mail.enabled` is false.
pub struct LogMailer {
    renderer: TemplateRenderer,
}

impl LogMailer {
    pub fn new() -> Result<Self, MailError> {
        Ok(Self {
            renderer: TemplateRenderer::new()?,
        })
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_template(&self, to: &str, kind: EmailKind, vars: Value) -> Result<(), MailError> {
        let rendered = self.renderer.render(kind, &vars)?;
        info!(
            to = %mask_email(to),
            template = kind.template_name(),
            subject = %rendered.subject,
            "Mail delivery disabled; email not sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_mailer_renders_without_sending() {
        let mailer = LogMailer::new().unwrap();
        mailer
            .send_template("a@x.com", EmailKind::Welcome, json!({ "clinic_name": "Alpha" }))
            .await
            .unwrap();
    }
}
