use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use clinic_api::{build_router, AppState};
use clinic_core::integrations::{CrmClient, Mailer};
use clinic_core::repositories::Repositories;
use clinic_infrastructure::{create_pool, postgres_repositories, run_migrations, HttpCrmClient, LogMailer, SmtpMailer};
use clinic_shared::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Load configuration
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize telemetry; the guard flushes the file writer on exit
    let _log_guard = clinic_shared::telemetry::init_telemetry(&config.logging)?;
    info!(env = %config.app.env, "{} starting...", config.app.name);

    // Storage
    let repos = if config.database.is_memory() {
        warn!("Using the in-memory store; data is lost on restart");
        Repositories::in_memory()
    } else {
        info!("Connecting to database...");
        let pool = create_pool(&config.database)
            .await
            .context("failed to connect to the database")?;
        run_migrations(&pool).await.context("failed to run migrations")?;
        info!("Database connection established.");
        postgres_repositories(pool)
    };

    // Integrations
    let mailer: Arc<dyn Mailer> = if config.mail.enabled {
        info!(host = %config.mail.smtp_host, "SMTP delivery enabled");
        Arc::new(SmtpMailer::new(&config.mail)?)
    } else {
        Arc::new(LogMailer::new()?)
    };
    if config.crm.api_key.is_empty() {
        warn!("CRM api key is not set; CRM calls will be rejected upstream");
    }
    let crm: Arc<dyn CrmClient> = Arc::new(HttpCrmClient::new(&config.crm)?);
    if config.webhook.bearer_token.is_none() && config.webhook.custom_secret.is_none() {
        warn!("No webhook credential configured; subscription webhooks will be rejected");
    }

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));

    let app = build_router(AppState::new(config, repos, mailer, crm));

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
