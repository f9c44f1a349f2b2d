//! Caller identity handlers

use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use stackpilot_core::domain::CallerRole;

use crate::auth::AuthUser;
use crate::response::ApiResponse;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub role: CallerRole,
    pub is_staff: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
}

/// Caller identity echo - GET /api/v1/me
pub async fn me(AuthUser(caller): AuthUser) -> Json<ApiResponse<MeResponse>> {
    Json(ApiResponse::success(MeResponse {
        id: caller.user_id,
        role: caller.role,
        is_staff: caller.is_staff(),
        tenant_id: caller.tenant_id,
    }))
}
