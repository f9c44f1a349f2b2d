//! Instance HTTP handlers (list, create, lifecycle actions, logs)

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use stackpilot_core::domain::{
    ActionLog, ActionLogStatus, Instance, InstanceState, LifecycleAction,
};
use stackpilot_core::services::{AccessScopeGuard, CreateInstance};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Create request payload
#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub modules: Vec<String>,
    /// Staff only: the tenant to create the instance for.
    pub tenant_id: Option<Uuid>,
}

/// Instance DTO for responses
#[derive(Debug, Serialize)]
pub struct InstanceDto {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub port: i32,
    pub db_name: String,
    pub state: InstanceState,
    pub state_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    // Staff view only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
}

impl InstanceDto {
    fn from_instance(instance: &Instance) -> Self {
        Self {
            id: instance.id,
            name: instance.name.clone(),
            domain: instance.domain.clone(),
            port: instance.port,
            db_name: instance.db_name.clone(),
            state: instance.state,
            state_label: instance.state.label().to_string(),
            last_error: instance.last_error.clone(),
            created_at: instance.created_at,
            tenant_id: None,
            company_name: None,
            plan_name: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActionLogDto {
    pub id: Uuid,
    pub action: LifecycleAction,
    pub status: ActionLogStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

impl From<ActionLog> for ActionLogDto {
    fn from(log: ActionLog) -> Self {
        Self {
            id: log.id,
            action: log.action,
            status: log.status,
            error_message: log.error_message,
            duration_seconds: log.duration_seconds,
            details: log.details,
            created_at: log.created_at,
        }
    }
}

/// List instances within scope - GET /api/v1/instances
pub async fn list_instances(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<ApiResponse<Vec<InstanceDto>>>, ApiError> {
    let scope = AccessScopeGuard::scope(&caller)?;
    let instances = state.registry.list_by_scope(&scope).await?;

    let mut rows: Vec<InstanceDto> = instances.iter().map(InstanceDto::from_instance).collect();

    // Staff rows carry the owning tenant and plan.
    if caller.is_staff() {
        let companies: HashMap<Uuid, String> = state
            .tenants
            .list()
            .await?
            .into_iter()
            .map(|t| (t.id, t.company_name))
            .collect();
        let plan_names: HashMap<Uuid, String> = state
            .plans
            .list()
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        let subscription_plans: HashMap<Uuid, Uuid> = state
            .subscriptions
            .list()
            .await?
            .into_iter()
            .map(|s| (s.id, s.plan_id))
            .collect();

        for (row, instance) in rows.iter_mut().zip(instances.iter()) {
            row.tenant_id = Some(instance.tenant_id);
            row.company_name = companies.get(&instance.tenant_id).cloned();
            row.plan_name = subscription_plans
                .get(&instance.subscription_id)
                .and_then(|plan_id| plan_names.get(plan_id))
                .cloned();
        }
    }

    Ok(Json(ApiResponse::success(rows)))
}

/// Create an instance - POST /api/v1/instances
pub async fn create_instance(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CreateInstanceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InstanceDto>>), ApiError> {
    let instance = state
        .dispatcher
        .create(
            &caller,
            CreateInstance {
                name: payload.name,
                domain: payload.domain,
                modules: payload.modules,
                tenant_id: payload.tenant_id,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(InstanceDto::from_instance(&instance))),
    ))
}

/// POST /api/v1/instances/{id}/start
pub async fn start_instance(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InstanceDto>>, ApiError> {
    dispatch(state, caller, id, LifecycleAction::Start).await
}

/// POST /api/v1/instances/{id}/stop
pub async fn stop_instance(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InstanceDto>>, ApiError> {
    dispatch(state, caller, id, LifecycleAction::Stop).await
}

/// POST /api/v1/instances/{id}/restart
pub async fn restart_instance(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InstanceDto>>, ApiError> {
    dispatch(state, caller, id, LifecycleAction::Restart).await
}

/// POST /api/v1/instances/{id}/remove
pub async fn remove_instance(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InstanceDto>>, ApiError> {
    dispatch(state, caller, id, LifecycleAction::Delete).await
}

async fn dispatch(
    state: AppState,
    caller: stackpilot_core::domain::CallerIdentity,
    id: Uuid,
    action: LifecycleAction,
) -> Result<Json<ApiResponse<InstanceDto>>, ApiError> {
    let instance = state.dispatcher.dispatch(&caller, &id, action).await?;
    Ok(Json(ApiResponse::success(InstanceDto::from_instance(
        &instance,
    ))))
}

/// Action history for an instance - GET /api/v1/instances/{id}/logs
pub async fn instance_logs(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ActionLogDto>>>, ApiError> {
    let instance = state
        .registry
        .get(&id)
        .await?
        .ok_or(stackpilot_core::error::DomainError::NotFound)?;
    AccessScopeGuard::authorize_instance(&caller, &instance)?;

    let logs = state.action_logs.list_by_instance(&id).await?;
    Ok(Json(ApiResponse::success(
        logs.into_iter().map(ActionLogDto::from).collect(),
    )))
}
