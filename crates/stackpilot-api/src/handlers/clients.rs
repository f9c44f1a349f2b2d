//! Tenant account handlers (staff-only)

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use stackpilot_core::domain::{BillingCycle, SubscriptionStatus};
use stackpilot_core::services::AccessScopeGuard;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClientDto {
    pub id: Uuid,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionSummary>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionSummary {
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
}

/// Tenant listing with active subscription summary - GET /api/v1/clients
pub async fn list_clients(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<ApiResponse<Vec<ClientDto>>>, ApiError> {
    AccessScopeGuard::require_staff(&caller)?;

    let tenants = state.tenants.list().await?;
    let plans = state.plans.list().await?;

    let mut rows = Vec::with_capacity(tenants.len());
    for tenant in tenants {
        let subscription = state
            .subscriptions
            .find_current_by_tenant(&tenant.id)
            .await?
            .and_then(|s| {
                plans
                    .iter()
                    .find(|p| p.id == s.plan_id)
                    .map(|p| SubscriptionSummary {
                        plan_name: p.name.clone(),
                        status: s.status,
                        billing_cycle: s.billing_cycle,
                    })
            });

        rows.push(ClientDto {
            id: tenant.id,
            company_name: tenant.company_name,
            phone: tenant.phone,
            created_at: tenant.created_at,
            subscription,
        });
    }

    Ok(Json(ApiResponse::success(rows)))
}
