//! PostgreSQL subscription repository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use stackpilot_core::domain::{BillingCycle, Subscription, SubscriptionStatus};
use stackpilot_core::error::DomainError;
use stackpilot_core::repositories::SubscriptionRepository;

pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct SubscriptionRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub status: String,
    pub billing_cycle: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub auto_renew: bool,
    pub next_billing_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = SubscriptionStatus::from_str(&row.status).ok_or_else(|| {
            DomainError::DatabaseError(format!("unknown subscription status: {}", row.status))
        })?;
        let billing_cycle = BillingCycle::from_str(&row.billing_cycle).ok_or_else(|| {
            DomainError::DatabaseError(format!("unknown billing cycle: {}", row.billing_cycle))
        })?;

        Ok(Subscription {
            id: row.id,
            tenant_id: row.tenant_id,
            plan_id: row.plan_id,
            status,
            billing_cycle,
            start_date: row.start_date,
            end_date: row.end_date,
            auto_renew: row.auto_renew,
            next_billing_date: row.next_billing_date,
            created_at: row.created_at,
        })
    }
}

fn collect(rows: Vec<SubscriptionRow>) -> Result<Vec<Subscription>, DomainError> {
    rows.into_iter().map(Subscription::try_from).collect()
}

const SUBSCRIPTION_COLUMNS: &str = r#"
    id, tenant_id, plan_id, status, billing_cycle,
    start_date, end_date, auto_renew, next_billing_date, created_at
"#;

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding subscription by id: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_current_by_tenant(
        &self,
        tenant_id: &Uuid,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding current subscription: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing subscriptions: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        collect(rows)
    }

    async fn list_by_tenant(&self, tenant_id: &Uuid) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing tenant subscriptions: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        collect(rows)
    }

    async fn list_active(&self) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE status = 'ACTIVE'"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing active subscriptions: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        collect(rows)
    }

    async fn create(&self, subscription: &Subscription) -> Result<Subscription, DomainError> {
        info!(
            "Creating subscription for tenant {} on plan {}",
            subscription.tenant_id, subscription.plan_id
        );

        let row: SubscriptionRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO subscriptions (
                id, tenant_id, plan_id, status, billing_cycle,
                start_date, end_date, auto_renew, next_billing_date, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(subscription.id)
        .bind(subscription.tenant_id)
        .bind(subscription.plan_id)
        .bind(subscription.status.as_str())
        .bind(subscription.billing_cycle.as_str())
        .bind(subscription.start_date)
        .bind(subscription.end_date)
        .bind(subscription.auto_renew)
        .bind(subscription.next_billing_date)
        .bind(subscription.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error creating subscription: {}", e);
            let msg = e.to_string();
            if msg.contains("unique") || msg.contains("duplicate") {
                DomainError::ValidationError(
                    "tenant already has an active subscription".to_string(),
                )
            } else {
                DomainError::DatabaseError(msg)
            }
        })?;

        row.try_into()
    }

    async fn update(&self, subscription: &Subscription) -> Result<Subscription, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE subscriptions
            SET plan_id = $2,
                status = $3,
                billing_cycle = $4,
                end_date = $5,
                auto_renew = $6,
                next_billing_date = $7
            WHERE id = $1
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(subscription.id)
        .bind(subscription.plan_id)
        .bind(subscription.status.as_str())
        .bind(subscription.billing_cycle.as_str())
        .bind(subscription.end_date)
        .bind(subscription.auto_renew)
        .bind(subscription.next_billing_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error updating subscription: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        row.map(Subscription::try_from)
            .transpose()?
            .ok_or(DomainError::NotFound)
    }

    async fn suspend_active_for_tenant(&self, tenant_id: &Uuid) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'SUSPENDED' WHERE tenant_id = $1 AND status = 'ACTIVE'",
        )
        .bind(tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error suspending subscriptions: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(result.rows_affected())
    }
}
