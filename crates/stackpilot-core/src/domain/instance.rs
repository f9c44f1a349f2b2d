//! Instance entity: a provisioned per-tenant application stack.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lifecycle::InstanceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Subscription under which this instance was provisioned.
    pub subscription_id: Uuid,

    pub name: String,
    pub domain: String,
    pub port: i32,
    pub db_name: String,
    #[serde(skip_serializing, default)]
    pub db_password: String,

    pub state: InstanceState,
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub last_transitioned_at: DateTime<Utc>,
}

impl Instance {
    /// Counts toward the tenant's quota and holds its port/db allocation.
    pub fn is_live(&self) -> bool {
        self.state != InstanceState::Removed
    }
}

/// What the Action Dispatcher hands the registry on CREATE. The registry
/// allocates port, database name, and credentials.
#[derive(Debug, Clone)]
pub struct InstanceDraft {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub subscription_id: Uuid,
    pub name: String,
    pub domain: String,
}
