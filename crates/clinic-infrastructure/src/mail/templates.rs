// ============================================================================
// Clinic Infrastructure - Email Templates
// File: crates/clinic-infrastructure/src/mail/templates.rs
// ============================================================================

use handlebars::Handlebars;
use serde_json::Value;

use clinic_core::integrations::{EmailKind, MailError};

const TEMPLATES: [(&str, &str); 5] = [
    ("welcome", include_str!("../../templates/welcome.hbs")),
    ("cancellation", include_str!("../../templates/cancellation.hbs")),
    ("payment_reminder", include_str!("../../templates/payment_reminder.hbs")),
    ("renewal_confirmation", include_str!("../../templates/renewal_confirmation.hbs")),
    ("coach_credentials", include_str!("../../templates/coach_credentials.hbs")),
];

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Compiled handlebars registry for every `EmailKind`.
pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self, MailError> {
        let mut registry = Handlebars::new();
        for (name, source) in TEMPLATES {
            registry
                .register_template_string(name, source)
                .map_err(|e| MailError::Template(format!("{}: {}", name, e)))?;
        }
        Ok(Self { registry })
    }

    pub fn render(&self, kind: EmailKind, vars: &Value) -> Result<RenderedEmail, MailError> {
        let html = self
            .registry
            .render(kind.template_name(), vars)
            .map_err(|e| MailError::Template(e.to_string()))?;
        Ok(RenderedEmail {
            subject: kind.subject().to_string(),
            html,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_kind_has_a_template() {
        let renderer = TemplateRenderer::new().unwrap();
        for kind in EmailKind::all() {
            assert!(renderer.render(kind, &json!({})).is_ok(), "{:?}", kind);
        }
    }

    #[test]
    fn test_coach_credentials_render() {
        let renderer = TemplateRenderer::new().unwrap();
        let email = renderer
            .render(
                EmailKind::CoachCredentials,
                &json!({
                    "name": "Cory",
                    "email": "cory@x.com",
                    "password": "Abc123xyz0987654",
                    "clinic_name": "Alpha",
                    "login_url": "http://localhost:8080/login",
                }),
            )
            .unwrap();
        assert_eq!(email.subject, "Your coach account credentials");
        assert!(email.html.contains("Abc123xyz0987654"));
        assert!(email.html.contains("http://localhost:8080/login"));
    }

    #[test]
    fn test_optional_sections_are_omitted() {
        let renderer = TemplateRenderer::new().unwrap();
        let email = renderer
            .render(EmailKind::PaymentReminder, &json!({ "clinic_name": "Alpha" }))
            .unwrap();
        assert!(!email.html.contains("Reason:"));
    }
}
