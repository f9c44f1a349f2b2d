//! Staff dashboard handlers

use axum::{extract::State, Json};

use stackpilot_core::services::{AccessScopeGuard, DashboardSummary};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Aggregated portal figures - GET /api/v1/dashboard/summary
pub async fn dashboard_summary(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<ApiResponse<DashboardSummary>>, ApiError> {
    AccessScopeGuard::require_staff(&caller)?;
    let summary = state.reporting.dashboard_summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}
