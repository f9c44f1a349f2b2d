//! Subscription handlers (staff-only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stackpilot_core::domain::{BillingCycle, Subscription, SubscriptionStatus};
use stackpilot_core::error::DomainError;
use stackpilot_core::services::AccessScopeGuard;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    #[serde(default = "default_true")]
    pub auto_renew: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub status: Option<SubscriptionStatus>,
    pub plan_id: Option<Uuid>,
    pub auto_renew: Option<bool>,
    pub end_date: Option<NaiveDate>,
    pub next_billing_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionDto {
    #[serde(flatten)]
    pub subscription: Subscription,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
}

/// GET /api/v1/subscriptions (staff)
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<ApiResponse<Vec<SubscriptionDto>>>, ApiError> {
    AccessScopeGuard::require_staff(&caller)?;

    let plans = state.plans.list().await?;
    let subscriptions = state.subscriptions.list().await?;

    let rows = subscriptions
        .into_iter()
        .map(|s| {
            let plan_name = plans
                .iter()
                .find(|p| p.id == s.plan_id)
                .map(|p| p.name.clone());
            SubscriptionDto {
                subscription: s,
                plan_name,
            }
        })
        .collect();

    Ok(Json(ApiResponse::success(rows)))
}

/// POST /api/v1/subscriptions (staff)
///
/// Activating a subscription suspends any previous ACTIVE subscription of
/// the tenant, keeping at most one ACTIVE binding per tenant.
pub async fn create_subscription(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Subscription>>), ApiError> {
    AccessScopeGuard::require_staff(&caller)?;

    state
        .tenants
        .find_by_id(&payload.tenant_id)
        .await?
        .ok_or(DomainError::NotFound)?;
    let plan = state
        .plans
        .find_by_id(&payload.plan_id)
        .await?
        .ok_or(DomainError::NotFound)?;
    if !plan.is_active {
        return Err(DomainError::ValidationError(format!(
            "plan is no longer offered: {}",
            plan.name
        ))
        .into());
    }

    state
        .subscriptions
        .suspend_active_for_tenant(&payload.tenant_id)
        .await?;

    let subscription = Subscription::new(
        payload.tenant_id,
        payload.plan_id,
        payload.billing_cycle,
        payload.auto_renew,
    );
    let created = state.subscriptions.create(&subscription).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// PUT /api/v1/subscriptions/{id} (staff)
pub async fn update_subscription(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> Result<Json<ApiResponse<Subscription>>, ApiError> {
    AccessScopeGuard::require_staff(&caller)?;

    let mut subscription = state
        .subscriptions
        .find_by_id(&id)
        .await?
        .ok_or(DomainError::NotFound)?;

    if let Some(plan_id) = payload.plan_id {
        state
            .plans
            .find_by_id(&plan_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        subscription.plan_id = plan_id;
    }
    if let Some(status) = payload.status {
        // Re-activating must not break the one-ACTIVE invariant.
        if status == SubscriptionStatus::Active && !subscription.is_active() {
            state
                .subscriptions
                .suspend_active_for_tenant(&subscription.tenant_id)
                .await?;
        }
        subscription.status = status;
    }
    if let Some(auto_renew) = payload.auto_renew {
        subscription.auto_renew = auto_renew;
    }
    if payload.end_date.is_some() {
        subscription.end_date = payload.end_date;
    }
    if payload.next_billing_date.is_some() {
        subscription.next_billing_date = payload.next_billing_date;
    }

    let updated = state.subscriptions.update(&subscription).await?;
    Ok(Json(ApiResponse::success(updated)))
}
