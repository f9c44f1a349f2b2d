//! Plan catalog handlers
//!
//! The catalog is readable by any authenticated caller; mutations are
//! staff-only and answer NotFound to everyone else.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use stackpilot_core::domain::Plan;
use stackpilot_core::error::DomainError;
use stackpilot_core::services::AccessScopeGuard;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlanPayload {
    pub name: String,
    pub price: f64,
    pub max_users: i32,
    pub storage_limit_gb: i32,
    pub max_instances: i32,
    #[serde(default)]
    pub allowed_modules: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// GET /api/v1/plans
pub async fn list_plans(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<ApiResponse<Vec<Plan>>>, ApiError> {
    let plans = state.plans.list().await?;
    Ok(Json(ApiResponse::success(plans)))
}

/// POST /api/v1/plans (staff)
pub async fn create_plan(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<PlanPayload>,
) -> Result<(StatusCode, Json<ApiResponse<Plan>>), ApiError> {
    AccessScopeGuard::require_staff(&caller)?;

    let mut plan = Plan::new(
        payload.name,
        payload.price,
        payload.max_users,
        payload.storage_limit_gb,
        payload.max_instances,
        payload.allowed_modules,
    )
    .map_err(|e| DomainError::ValidationError(e.to_string()))?;
    plan.is_active = payload.is_active;

    let created = state.plans.create(&plan).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// PUT /api/v1/plans/{id} (staff)
pub async fn update_plan(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PlanPayload>,
) -> Result<Json<ApiResponse<Plan>>, ApiError> {
    AccessScopeGuard::require_staff(&caller)?;

    let mut plan = state
        .plans
        .find_by_id(&id)
        .await?
        .ok_or(DomainError::NotFound)?;

    plan.name = payload.name.trim().to_string();
    plan.price = payload.price;
    plan.max_users = payload.max_users;
    plan.storage_limit_gb = payload.storage_limit_gb;
    plan.max_instances = payload.max_instances;
    plan.allowed_modules = payload.allowed_modules;
    plan.is_active = payload.is_active;

    validator::Validate::validate(&plan)
        .map_err(|e| DomainError::ValidationError(e.to_string()))?;

    let updated = state.plans.update(&plan).await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// DELETE /api/v1/plans/{id} (staff)
pub async fn delete_plan(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    AccessScopeGuard::require_staff(&caller)?;
    state.plans.delete(&id).await?;
    Ok(Json(ApiResponse::success(())))
}
