//! PostgreSQL instance registry
//!
//! `compare_and_transition` is a single conditional UPDATE: zero affected
//! rows means the stored state moved underneath the caller (`StaleState`).
//! Port/name allocation runs under a transaction-scoped advisory lock so
//! concurrent creates cannot race the free-port scan.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use stackpilot_shared::constants::{DB_NAME_PREFIX, DB_PASSWORD_LEN};

use stackpilot_core::domain::{AccessScope, Instance, InstanceDraft, InstanceState};
use stackpilot_core::error::DomainError;
use stackpilot_core::registry::InstanceRegistry;

// Advisory lock key for port/name allocation.
const ALLOCATION_LOCK_KEY: i64 = 0x5741_1053;

pub struct PgInstanceRegistry {
    pool: PgPool,
    port_range_start: u16,
    port_range_end: u16,
}

impl PgInstanceRegistry {
    pub fn new(pool: PgPool, port_range_start: u16, port_range_end: u16) -> Self {
        Self {
            pool,
            port_range_start,
            port_range_end,
        }
    }

    fn generate_db_password() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(DB_PASSWORD_LEN)
            .map(char::from)
            .collect()
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct InstanceRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub subscription_id: Uuid,
    pub name: String,
    pub domain: String,
    pub port: i32,
    pub db_name: String,
    pub db_password: String,
    pub state: String,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_transitioned_at: DateTime<Utc>,
}

impl TryFrom<InstanceRow> for Instance {
    type Error = DomainError;

    fn try_from(row: InstanceRow) -> Result<Self, Self::Error> {
        let state = InstanceState::from_str(&row.state).ok_or_else(|| {
            DomainError::DatabaseError(format!("unknown instance state: {}", row.state))
        })?;

        Ok(Instance {
            id: row.id,
            tenant_id: row.tenant_id,
            subscription_id: row.subscription_id,
            name: row.name,
            domain: row.domain,
            port: row.port,
            db_name: row.db_name,
            db_password: row.db_password,
            state,
            last_error: row.last_error,
            created_at: row.created_at,
            last_transitioned_at: row.last_transitioned_at,
        })
    }
}

fn collect(rows: Vec<InstanceRow>) -> Result<Vec<Instance>, DomainError> {
    rows.into_iter().map(Instance::try_from).collect()
}

const INSTANCE_COLUMNS: &str = r#"
    id, tenant_id, subscription_id, name, domain, port, db_name, db_password,
    state, last_error, created_at, last_transitioned_at
"#;

#[async_trait]
impl InstanceRegistry for PgInstanceRegistry {
    async fn get(&self, id: &Uuid) -> Result<Option<Instance>, DomainError> {
        let row: Option<InstanceRow> = sqlx::query_as(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM instances WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding instance by id: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        row.map(Instance::try_from).transpose()
    }

    async fn list_by_scope(&self, scope: &AccessScope) -> Result<Vec<Instance>, DomainError> {
        let rows: Vec<InstanceRow> = match scope {
            AccessScope::All => {
                sqlx::query_as(&format!(
                    "SELECT {INSTANCE_COLUMNS} FROM instances ORDER BY created_at"
                ))
                .fetch_all(&self.pool)
                .await
            }
            AccessScope::Tenant(tenant_id) => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {INSTANCE_COLUMNS} FROM instances
                    WHERE tenant_id = $1
                    ORDER BY created_at
                    "#
                ))
                .bind(tenant_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e: sqlx::Error| {
            error!("Database error listing instances: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        collect(rows)
    }

    async fn list_in_states(
        &self,
        states: &[InstanceState],
    ) -> Result<Vec<Instance>, DomainError> {
        let names: Vec<String> = states.iter().map(|s| s.as_str().to_string()).collect();
        let rows: Vec<InstanceRow> = sqlx::query_as(&format!(
            r#"
            SELECT {INSTANCE_COLUMNS} FROM instances
            WHERE state = ANY($1)
            ORDER BY created_at
            "#
        ))
        .bind(&names)
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing instances by state: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        collect(rows)
    }

    async fn count_live_for_tenant(&self, tenant_id: &Uuid) -> Result<i64, DomainError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM instances WHERE tenant_id = $1 AND state <> 'REMOVED'",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error counting instances: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(count)
    }

    async fn create(&self, draft: InstanceDraft) -> Result<Instance, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Database error opening transaction: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        // Serialize allocation against concurrent creates.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ALLOCATION_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        let taken: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT name FROM instances
            WHERE (name = $1 OR domain = $2) AND state <> 'REMOVED'
            LIMIT 1
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.domain)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        if taken.is_some() {
            return Err(DomainError::ValidationError(format!(
                "instance name or domain already in use: {}",
                draft.name
            )));
        }

        let used: Vec<i32> =
            sqlx::query_scalar("SELECT port FROM instances WHERE state <> 'REMOVED'")
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        let port = (self.port_range_start..=self.port_range_end)
            .find(|p| !used.contains(&(*p as i32)))
            .ok_or_else(|| {
                DomainError::ResourceExhausted(format!(
                    "port range {}-{} exhausted",
                    self.port_range_start, self.port_range_end
                ))
            })?;

        let now = Utc::now();
        let row: InstanceRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO instances (
                id, tenant_id, subscription_id, name, domain, port, db_name,
                db_password, state, last_error, created_at, last_transitioned_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, $10, $10)
            RETURNING {INSTANCE_COLUMNS}
            "#
        ))
        .bind(draft.id)
        .bind(draft.tenant_id)
        .bind(draft.subscription_id)
        .bind(&draft.name)
        .bind(&draft.domain)
        .bind(port as i32)
        .bind(format!("{}{}", DB_NAME_PREFIX, draft.name))
        .bind(Self::generate_db_password())
        .bind(InstanceState::Created.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error creating instance: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        tx.commit().await.map_err(|e| {
            error!("Database error committing instance create: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        info!("Instance created: {} on port {}", row.id, row.port);
        row.try_into()
    }

    async fn compare_and_transition(
        &self,
        id: &Uuid,
        expected: InstanceState,
        next: InstanceState,
        error_message: Option<String>,
    ) -> Result<Instance, DomainError> {
        let row: Option<InstanceRow> = sqlx::query_as(&format!(
            r#"
            UPDATE instances
            SET state = $3,
                last_error = $4,
                last_transitioned_at = NOW()
            WHERE id = $1 AND state = $2
            RETURNING {INSTANCE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(&error_message)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error transitioning instance: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        if let Some(row) = row {
            return row.try_into();
        }

        // Zero rows: either the instance is gone or its state moved.
        let current: Option<String> =
            sqlx::query_scalar("SELECT state FROM instances WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        match current {
            None => Err(DomainError::NotFound),
            Some(actual) => {
                let actual = InstanceState::from_str(&actual).ok_or_else(|| {
                    DomainError::DatabaseError(format!("unknown instance state: {actual}"))
                })?;
                Err(DomainError::StaleState { expected, actual })
            }
        }
    }
}
