// ============================================================================
// Clinic Infrastructure - PostgreSQL Subscription Repository
// File: crates/clinic-infrastructure/src/database/postgres/subscription_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use clinic_core::domain::{SubscriptionHistory, SubscriptionProvider, SubscriptionTier};
use clinic_core::error::DomainError;
use clinic_core::repositories::SubscriptionRepository;

use super::is_unique_violation;

const TIER_COLUMNS: &str = "id, clinic_id, plan_id, subscription_id, crm_contact_id, is_active, \
     start_date, end_date, provider, created_at, updated_at";

pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SubscriptionTierRow {
    id: Uuid,
    clinic_id: Uuid,
    plan_id: String,
    subscription_id: Option<String>,
    crm_contact_id: Option<String>,
    is_active: bool,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    provider: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SubscriptionTierRow> for SubscriptionTier {
    fn from(row: SubscriptionTierRow) -> Self {
        SubscriptionTier {
            id: row.id,
            clinic_id: row.clinic_id,
            plan_id: row.plan_id,
            subscription_id: row.subscription_id,
            crm_contact_id: row.crm_contact_id,
            is_active: row.is_active,
            start_date: row.start_date,
            end_date: row.end_date,
            provider: row.provider.parse::<SubscriptionProvider>().unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SubscriptionHistoryRow {
    id: Uuid,
    clinic_id: Uuid,
    subscription_id: Uuid,
    payment_amount: f64,
    created_at: DateTime<Utc>,
}

impl From<SubscriptionHistoryRow> for SubscriptionHistory {
    fn from(row: SubscriptionHistoryRow) -> Self {
        SubscriptionHistory {
            id: row.id,
            clinic_id: row.clinic_id,
            subscription_id: row.subscription_id,
            payment_amount: row.payment_amount,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_latest_by_clinic(&self, clinic_id: &Uuid) -> Result<Option<SubscriptionTier>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscription_tiers WHERE clinic_id = $1 ORDER BY created_at DESC LIMIT 1",
            TIER_COLUMNS
        );
        let row: Option<SubscriptionTierRow> = sqlx::query_as(&sql)
            .bind(clinic_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error finding subscription for clinic {}: {}", clinic_id, e);
                DomainError::DatabaseError(e.to_string())
            })?;
        Ok(row.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<SubscriptionTier>, DomainError> {
        let sql = format!("SELECT {} FROM subscription_tiers ORDER BY created_at DESC", TIER_COLUMNS);
        let rows: Vec<SubscriptionTierRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error listing subscriptions: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, tier: &SubscriptionTier) -> Result<SubscriptionTier, DomainError> {
        info!("Creating subscription {} for clinic {}", tier.id, tier.clinic_id);
        let sql = format!(
            "INSERT INTO subscription_tiers ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {cols}",
            cols = TIER_COLUMNS
        );
        let row: SubscriptionTierRow = sqlx::query_as(&sql)
            .bind(tier.id)
            .bind(tier.clinic_id)
            .bind(&tier.plan_id)
            .bind(&tier.subscription_id)
            .bind(&tier.crm_contact_id)
            .bind(tier.is_active)
            .bind(tier.start_date)
            .bind(tier.end_date)
            .bind(tier.provider.as_str())
            .bind(tier.created_at)
            .bind(tier.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                if is_unique_violation(&e) {
                    return DomainError::SubscriptionAlreadyExists(tier.clinic_id);
                }
                error!("Database error creating subscription: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;
        Ok(row.into())
    }

    async fn update(&self, tier: &SubscriptionTier) -> Result<SubscriptionTier, DomainError> {
        let sql = format!(
            r#"
            UPDATE subscription_tiers SET
                plan_id = $2, subscription_id = $3, crm_contact_id = $4, is_active = $5,
                start_date = $6, end_date = $7, provider = $8, updated_at = $9
            WHERE id = $1
            RETURNING {}
            "#,
            TIER_COLUMNS
        );
        let row: Option<SubscriptionTierRow> = sqlx::query_as(&sql)
            .bind(tier.id)
            .bind(&tier.plan_id)
            .bind(&tier.subscription_id)
            .bind(&tier.crm_contact_id)
            .bind(tier.is_active)
            .bind(tier.start_date)
            .bind(tier.end_date)
            .bind(tier.provider.as_str())
            .bind(tier.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error updating subscription: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;
        row.map(Into::into).ok_or(DomainError::SubscriptionNotFound)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM subscription_tiers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error deleting subscription: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;
        Ok(())
    }

    async fn create_history_once(&self, history: &SubscriptionHistory) -> Result<SubscriptionHistory, DomainError> {
        // ON CONFLICT returns no row when the ledger entry already exists
        let inserted: Option<SubscriptionHistoryRow> = sqlx::query_as(
            r#"
            INSERT INTO subscription_history (id, clinic_id, subscription_id, payment_amount, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (subscription_id) DO NOTHING
            RETURNING id, clinic_id, subscription_id, payment_amount, created_at
            "#,
        )
        .bind(history.id)
        .bind(history.clinic_id)
        .bind(history.subscription_id)
        .bind(history.payment_amount)
        .bind(history.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error recording payment: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        if let Some(row) = inserted {
            return Ok(row.into());
        }

        let existing: SubscriptionHistoryRow = sqlx::query_as(
            r#"
            SELECT id, clinic_id, subscription_id, payment_amount, created_at
            FROM subscription_history
            WHERE subscription_id = $1
            "#,
        )
        .bind(history.subscription_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error loading existing payment: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;
        Ok(existing.into())
    }

    async fn list_history(&self) -> Result<Vec<SubscriptionHistory>, DomainError> {
        let rows: Vec<SubscriptionHistoryRow> = sqlx::query_as(
            r#"
            SELECT id, clinic_id, subscription_id, payment_amount, created_at
            FROM subscription_history
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing payment history: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
