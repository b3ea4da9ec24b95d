// ============================================================================
// Clinic Infrastructure - PostgreSQL Clinic Repository
// File: crates/clinic-infrastructure/src/database/postgres/clinic_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use clinic_core::domain::Clinic;
use clinic_core::error::DomainError;
use clinic_core::repositories::ClinicRepository;

use super::is_unique_violation;

const CLINIC_COLUMNS: &str = "id, name, email, phone, primary_contact, street_address, city, state, \
     zip_code, crm_contact_id, created_at, updated_at";

pub struct PgClinicRepository {
    pool: PgPool,
}

impl PgClinicRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: &str, value: &str, label: &str) -> Result<Option<Clinic>, DomainError> {
        let sql = format!("SELECT {} FROM clinics WHERE {} = $1 ORDER BY created_at DESC LIMIT 1", CLINIC_COLUMNS, filter);
        let row: Option<ClinicRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error finding clinic by {}: {}", label, e);
                DomainError::DatabaseError(e.to_string())
            })?;
        Ok(row.map(Into::into))
    }
}

#[derive(Debug, FromRow)]
struct ClinicRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    primary_contact: Option<String>,
    street_address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    crm_contact_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ClinicRow> for Clinic {
    fn from(row: ClinicRow) -> Self {
        Clinic {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            primary_contact: row.primary_contact,
            street_address: row.street_address,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            crm_contact_id: row.crm_contact_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ClinicRepository for PgClinicRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Clinic>, DomainError> {
        let sql = format!("SELECT {} FROM clinics WHERE id = $1", CLINIC_COLUMNS);
        let row: Option<ClinicRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error finding clinic by id: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;
        Ok(row.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Clinic>, DomainError> {
        self.find_one("email", email, "email").await
    }

    async fn find_by_crm_contact_id(&self, contact_id: &str) -> Result<Option<Clinic>, DomainError> {
        self.find_one("crm_contact_id", contact_id, "crm contact id").await
    }

    async fn list(&self) -> Result<Vec<Clinic>, DomainError> {
        let sql = format!("SELECT {} FROM clinics ORDER BY created_at DESC", CLINIC_COLUMNS);
        let rows: Vec<ClinicRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error listing clinics: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(&self, clinic: &Clinic) -> Result<Clinic, DomainError> {
        info!("Creating clinic: {}", clinic.id);
        let sql = format!(
            "INSERT INTO clinics ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {cols}",
            cols = CLINIC_COLUMNS
        );
        let row: ClinicRow = sqlx::query_as(&sql)
            .bind(clinic.id)
            .bind(&clinic.name)
            .bind(&clinic.email)
            .bind(&clinic.phone)
            .bind(&clinic.primary_contact)
            .bind(&clinic.street_address)
            .bind(&clinic.city)
            .bind(&clinic.state)
            .bind(&clinic.zip_code)
            .bind(&clinic.crm_contact_id)
            .bind(clinic.created_at)
            .bind(clinic.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                if is_unique_violation(&e) {
                    return DomainError::ClinicAlreadyExists(clinic.email.clone());
                }
                error!("Database error creating clinic: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;
        Ok(row.into())
    }

    async fn update(&self, clinic: &Clinic) -> Result<Clinic, DomainError> {
        let sql = format!(
            r#"
            UPDATE clinics SET
                name = $2, email = $3, phone = $4, primary_contact = $5,
                street_address = $6, city = $7, state = $8, zip_code = $9,
                crm_contact_id = $10, updated_at = $11
            WHERE id = $1
            RETURNING {}
            "#,
            CLINIC_COLUMNS
        );
        let row: Option<ClinicRow> = sqlx::query_as(&sql)
            .bind(clinic.id)
            .bind(&clinic.name)
            .bind(&clinic.email)
            .bind(&clinic.phone)
            .bind(&clinic.primary_contact)
            .bind(&clinic.street_address)
            .bind(&clinic.city)
            .bind(&clinic.state)
            .bind(&clinic.zip_code)
            .bind(&clinic.crm_contact_id)
            .bind(clinic.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error updating clinic: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;
        row.map(Into::into).ok_or(DomainError::ClinicNotFound)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM clinics WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error deleting clinic: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;
        Ok(())
    }
}
