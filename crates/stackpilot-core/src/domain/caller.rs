//! Request-scoped caller identity and the access scope derived from it.
//!
//! The identity provider authenticates the caller; the core only consumes
//! "who is calling and with what scope". No ambient session state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallerRole {
    Staff,
    Tenant,
}

impl CallerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerRole::Staff => "STAFF",
            CallerRole::Tenant => "TENANT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "STAFF" => Some(CallerRole::Staff),
            "TENANT" => Some(CallerRole::Tenant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub role: CallerRole,
    /// Set for tenant callers; the account all their reads/writes bind to.
    pub tenant_id: Option<Uuid>,
}

impl CallerIdentity {
    pub fn staff(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: CallerRole::Staff,
            tenant_id: None,
        }
    }

    pub fn tenant(user_id: Uuid, tenant_id: Uuid) -> Self {
        Self {
            user_id,
            role: CallerRole::Tenant,
            tenant_id: Some(tenant_id),
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role == CallerRole::Staff
    }
}

/// The visible/operable set for a caller: everything, or one tenant's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    All,
    Tenant(Uuid),
}

impl AccessScope {
    pub fn permits(&self, owner_tenant_id: &Uuid) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Tenant(id) => id == owner_tenant_id,
        }
    }
}
