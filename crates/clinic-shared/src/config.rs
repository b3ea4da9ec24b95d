//! Configuration management

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::constants::{DEFAULT_SESSION_TTL_SECS, MEMORY_DATABASE_URL};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub webhook: WebhookSettings,
    pub crm: CrmSettings,
    pub mail: MailSettings,
    pub logging: LoggingSettings,
    #[serde(default = "default_plans")]
    pub plans: Vec<PlanSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub public_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn is_memory(&self) -> bool {
        self.url.trim() == MEMORY_DATABASE_URL
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub session_ttl_secs: i64,
}

/// What the webhook pipeline does with a status it cannot map.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownStatusPolicy {
    /// Treat it as `subscription.activated`.
    #[default]
    Activate,
    /// Log and stop; no state is touched.
    Ignore,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookSettings {
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub custom_secret: Option<String>,
    #[serde(default)]
    pub signature_secret: Option<String>,
    #[serde(default)]
    pub unknown_status: UnknownStatusPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrmSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub dashboard_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailSettings {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
    #[serde(default)]
    pub directory: Option<String>,
}

/// A purchasable plan and the CRM identifiers that back it.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PlanSettings {
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub payment_link: Option<String>,
    #[serde(default)]
    pub crm_product_id: Option<String>,
    #[serde(default)]
    pub crm_price_id: Option<String>,
}

fn default_plans() -> Vec<PlanSettings> {
    vec![
        PlanSettings {
            id: "basic_plan".into(),
            name: "Basic Plan".into(),
            price: 99.0,
            payment_link: Some("https://pay.gohighlevel.com/basic-plan".into()),
            crm_product_id: None,
            crm_price_id: None,
        },
        PlanSettings {
            id: "premium_plan".into(),
            name: "Premium Plan".into(),
            price: 199.0,
            payment_link: Some("https://pay.gohighlevel.com/premium-plan".into()),
            crm_product_id: None,
            crm_price_id: None,
        },
        PlanSettings {
            id: "enterprise_plan".into(),
            name: "Enterprise Plan".into(),
            price: 399.0,
            payment_link: Some("https://pay.gohighlevel.com/enterprise-plan".into()),
            crm_product_id: None,
            crm_price_id: None,
        },
    ]
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.host", "127.0.0.1")?
            .set_default("app.port", 8080)?
            .set_default("app.name", "clinic-server")?
            .set_default("app.public_base_url", "http://localhost:8080")?
            .set_default("database.url", MEMORY_DATABASE_URL)?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 3)?
            .set_default("jwt.secret", "change-me")?
            .set_default("jwt.session_ttl_secs", DEFAULT_SESSION_TTL_SECS)?
            .set_default("webhook.unknown_status", "activate")?
            .set_default("crm.base_url", "https://rest.gohighlevel.com/v1")?
            .set_default("crm.dashboard_url", "https://app.gohighlevel.com")?
            .set_default("crm.timeout_secs", 30)?
            .set_default("mail.enabled", false)?
            .set_default("mail.smtp_host", "localhost")?
            .set_default("mail.smtp_port", 587)?
            .set_default("mail.from_address", "no-reply@clienthealthtracker.com")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", true)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("CLINIC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }

    pub fn find_plan(&self, plan_id: &str) -> Option<&PlanSettings> {
        self.plans.iter().find(|p| p.id == plan_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plans_have_payment_links() {
        let plans = default_plans();
        assert_eq!(plans.len(), 3);
        assert!(plans.iter().all(|p| p.payment_link.is_some()));
    }

    #[test]
    fn test_unknown_status_policy_defaults_to_activate() {
        assert_eq!(UnknownStatusPolicy::default(), UnknownStatusPolicy::Activate);
    }

    #[test]
    fn test_memory_database_url() {
        let db = DatabaseSettings {
            url: "memory://".into(),
            max_connections: 1,
            acquire_timeout_secs: 1,
        };
        assert!(db.is_memory());
    }
}
