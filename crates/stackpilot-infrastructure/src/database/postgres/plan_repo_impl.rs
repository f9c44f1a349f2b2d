//! PostgreSQL plan catalog repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use stackpilot_core::domain::Plan;
use stackpilot_core::error::DomainError;
use stackpilot_core::repositories::PlanRepository;

pub struct PgPlanRepository {
    pool: PgPool,
}

impl PgPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct PlanRow {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub max_users: i32,
    pub storage_limit_gb: i32,
    pub max_instances: i32,
    pub allowed_modules: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PlanRow> for Plan {
    fn from(row: PlanRow) -> Self {
        Plan {
            id: row.id,
            name: row.name,
            price: row.price,
            max_users: row.max_users,
            storage_limit_gb: row.storage_limit_gb,
            max_instances: row.max_instances,
            allowed_modules: row.allowed_modules,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

const PLAN_COLUMNS: &str = r#"
    id, name, price, max_users, storage_limit_gb, max_instances,
    allowed_modules, is_active, created_at
"#;

#[async_trait]
impl PlanRepository for PgPlanRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Plan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding plan by id: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(&self) -> Result<Vec<Plan>, DomainError> {
        let rows: Vec<PlanRow> = sqlx::query_as(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans ORDER BY price"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing plans: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn create(&self, plan: &Plan) -> Result<Plan, DomainError> {
        info!("Creating plan: {}", plan.name);

        let row: PlanRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO plans (
                id, name, price, max_users, storage_limit_gb, max_instances,
                allowed_modules, is_active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(plan.id)
        .bind(&plan.name)
        .bind(plan.price)
        .bind(plan.max_users)
        .bind(plan.storage_limit_gb)
        .bind(plan.max_instances)
        .bind(&plan.allowed_modules)
        .bind(plan.is_active)
        .bind(plan.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error creating plan: {}", e);
            let msg = e.to_string();
            if msg.contains("unique") || msg.contains("duplicate") {
                DomainError::ValidationError(format!("plan name already exists: {}", plan.name))
            } else {
                DomainError::DatabaseError(msg)
            }
        })?;

        Ok(row.into())
    }

    async fn update(&self, plan: &Plan) -> Result<Plan, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(&format!(
            r#"
            UPDATE plans
            SET name = $2,
                price = $3,
                max_users = $4,
                storage_limit_gb = $5,
                max_instances = $6,
                allowed_modules = $7,
                is_active = $8
            WHERE id = $1
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(plan.id)
        .bind(&plan.name)
        .bind(plan.price)
        .bind(plan.max_users)
        .bind(plan.storage_limit_gb)
        .bind(plan.max_instances)
        .bind(&plan.allowed_modules)
        .bind(plan.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error updating plan: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        row.map(|r| r.into()).ok_or(DomainError::NotFound)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error deleting plan: {}", e);
                let msg = e.to_string();
                if msg.contains("foreign key") {
                    DomainError::ValidationError(
                        "plan is still referenced by subscriptions".to_string(),
                    )
                } else {
                    DomainError::DatabaseError(msg)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }
}
