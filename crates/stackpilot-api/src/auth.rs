//! Bearer-token authentication
//!
//! Tokens are issued by the external identity provider; this module only
//! validates them and produces a request-scoped `CallerIdentity`. No
//! process-wide session state.

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stackpilot_core::domain::{CallerIdentity, CallerRole};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // User ID (Subject)
    pub exp: usize,  // Expiration
    pub role: String, // STAFF | TENANT
    pub tenant_id: Option<Uuid>,
}

pub struct JwtKeys {
    decoding_key: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| ApiError::Unauthorized(format!("invalid token: {e}")))?;
        Ok(token_data.claims)
    }
}

/// Extractor producing the authenticated caller for a request.
pub struct AuthUser(pub CallerIdentity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("expected a bearer token".to_string()))?;

        let claims = state.jwt.validate_token(token)?;
        let caller = caller_from_claims(&claims)?;
        Ok(AuthUser(caller))
    }
}

fn caller_from_claims(claims: &Claims) -> Result<CallerIdentity, ApiError> {
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("malformed subject claim".to_string()))?;

    match CallerRole::from_str(&claims.role) {
        Some(CallerRole::Staff) => Ok(CallerIdentity::staff(user_id)),
        Some(CallerRole::Tenant) => {
            let tenant_id = claims.tenant_id.ok_or_else(|| {
                ApiError::Unauthorized("tenant token carries no tenant id".to_string())
            })?;
            Ok(CallerIdentity::tenant(user_id, tenant_id))
        }
        None => Err(ApiError::Unauthorized(format!(
            "unknown role: {}",
            claims.role
        ))),
    }
}
