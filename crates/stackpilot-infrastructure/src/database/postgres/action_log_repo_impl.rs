//! PostgreSQL action log repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::error;
use uuid::Uuid;

use stackpilot_core::domain::{ActionLog, ActionLogStatus, LifecycleAction};
use stackpilot_core::error::DomainError;
use stackpilot_core::repositories::ActionLogRepository;

pub struct PgActionLogRepository {
    pool: PgPool,
}

impl PgActionLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct ActionLogRow {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub status: String,
    pub error_message: Option<String>,
    pub duration_seconds: Option<i64>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ActionLogRow> for ActionLog {
    type Error = DomainError;

    fn try_from(row: ActionLogRow) -> Result<Self, Self::Error> {
        let action = LifecycleAction::from_str(&row.action).ok_or_else(|| {
            DomainError::DatabaseError(format!("unknown lifecycle action: {}", row.action))
        })?;
        let status = ActionLogStatus::from_str(&row.status).ok_or_else(|| {
            DomainError::DatabaseError(format!("unknown action log status: {}", row.status))
        })?;

        Ok(ActionLog {
            id: row.id,
            instance_id: row.instance_id,
            user_id: row.user_id,
            action,
            status,
            error_message: row.error_message,
            duration_seconds: row.duration_seconds,
            details: row.details,
            created_at: row.created_at,
        })
    }
}

const ACTION_LOG_COLUMNS: &str = r#"
    id, instance_id, user_id, action, status, error_message,
    duration_seconds, details, created_at
"#;

#[async_trait]
impl ActionLogRepository for PgActionLogRepository {
    async fn create(&self, log: &ActionLog) -> Result<ActionLog, DomainError> {
        let row: ActionLogRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO action_logs (
                id, instance_id, user_id, action, status, error_message,
                duration_seconds, details, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ACTION_LOG_COLUMNS}
            "#
        ))
        .bind(log.id)
        .bind(log.instance_id)
        .bind(log.user_id)
        .bind(log.action.as_str())
        .bind(log.status.as_str())
        .bind(&log.error_message)
        .bind(log.duration_seconds)
        .bind(&log.details)
        .bind(log.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error creating action log: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        row.try_into()
    }

    async fn finish(
        &self,
        id: &Uuid,
        status: ActionLogStatus,
        error_message: Option<String>,
        duration_seconds: i64,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE action_logs
            SET status = $2, error_message = $3, duration_seconds = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(&error_message)
        .bind(duration_seconds)
        .execute(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finishing action log: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    async fn list_by_instance(&self, instance_id: &Uuid) -> Result<Vec<ActionLog>, DomainError> {
        let rows: Vec<ActionLogRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ACTION_LOG_COLUMNS} FROM action_logs
            WHERE instance_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(instance_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing action logs: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        rows.into_iter().map(ActionLog::try_from).collect()
    }
}
