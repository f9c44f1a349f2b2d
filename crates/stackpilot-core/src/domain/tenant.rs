//! Tenant account entity
//!
//! Owned by the external identity/billing registry; the core reads it by
//! reference only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantAccount {
    pub id: Uuid,
    /// Identity-provider user that owns this account.
    pub user_id: Uuid,
    pub company_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}
