//! PostgreSQL tenant account repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::error;
use uuid::Uuid;

use stackpilot_core::domain::TenantAccount;
use stackpilot_core::error::DomainError;
use stackpilot_core::repositories::TenantRepository;

pub struct PgTenantRepository {
    pool: PgPool,
}

impl PgTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct TenantAccountRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<TenantAccountRow> for TenantAccount {
    fn from(row: TenantAccountRow) -> Self {
        TenantAccount {
            id: row.id,
            user_id: row.user_id,
            company_name: row.company_name,
            phone: row.phone,
            address: row.address,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl TenantRepository for PgTenantRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<TenantAccount>, DomainError> {
        let row: Option<TenantAccountRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, company_name, phone, address, created_at
            FROM tenant_accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding tenant by id: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_user_id(&self, user_id: &Uuid) -> Result<Option<TenantAccount>, DomainError> {
        let row: Option<TenantAccountRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, company_name, phone, address, created_at
            FROM tenant_accounts
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding tenant by user id: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(&self) -> Result<Vec<TenantAccount>, DomainError> {
        let rows: Vec<TenantAccountRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, company_name, phone, address, created_at
            FROM tenant_accounts
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing tenants: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}
