use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;

use clinic_core::error::DomainError;
use clinic_core::repositories::StoreHealth;

pub struct PgStoreHealth {
    pool: PgPool,
}

impl PgStoreHealth {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreHealth for PgStoreHealth {
    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e: sqlx::Error| {
                error!("Database health check failed: {}", e);
                DomainError::DatabaseError(e.to_string())
            })
    }
}
