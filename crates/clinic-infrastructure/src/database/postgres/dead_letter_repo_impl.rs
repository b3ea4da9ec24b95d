use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::error;
use uuid::Uuid;

use clinic_core::domain::CompensationFailure;
use clinic_core::error::DomainError;
use clinic_core::repositories::DeadLetterRepository;

pub struct PgDeadLetterRepository {
    pool: PgPool,
}

impl PgDeadLetterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CompensationFailureRow {
    id: Uuid,
    flow: String,
    entity_kind: String,
    entity_id: Uuid,
    error: String,
    created_at: DateTime<Utc>,
}

impl From<CompensationFailureRow> for CompensationFailure {
    fn from(row: CompensationFailureRow) -> Self {
        CompensationFailure {
            id: row.id,
            flow: row.flow,
            entity_kind: row.entity_kind,
            entity_id: row.entity_id,
            error: row.error,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl DeadLetterRepository for PgDeadLetterRepository {
    async fn record(&self, failure: &CompensationFailure) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO compensation_failures (id, flow, entity_kind, entity_id, error, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(failure.id)
        .bind(&failure.flow)
        .bind(&failure.entity_kind)
        .bind(failure.entity_id)
        .bind(&failure.error)
        .bind(failure.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error recording compensation failure: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CompensationFailure>, DomainError> {
        let rows: Vec<CompensationFailureRow> = sqlx::query_as(
            r#"
            SELECT id, flow, entity_kind, entity_id, error, created_at
            FROM compensation_failures
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing compensation failures: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
