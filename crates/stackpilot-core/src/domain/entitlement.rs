//! Entitlement snapshot derived from a tenant's current subscription + plan.
//!
//! Never persisted; valid only for the duration of a single dispatcher call.

use serde::{Deserialize, Serialize};

use super::plan::Plan;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementSnapshot {
    pub max_instances: i32,
    pub max_users: i32,
    pub storage_limit_gb: i32,
    pub allowed_modules: Vec<String>,
}

impl EntitlementSnapshot {
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            max_instances: plan.max_instances,
            max_users: plan.max_users,
            storage_limit_gb: plan.storage_limit_gb,
            allowed_modules: plan.allowed_modules.clone(),
        }
    }

    /// The envelope of a suspended or expired subscription: existing
    /// instances stay readable, nothing new may be created or started.
    pub fn zero() -> Self {
        Self {
            max_instances: 0,
            max_users: 0,
            storage_limit_gb: 0,
            allowed_modules: Vec::new(),
        }
    }

    pub fn module_allowed(&self, module: &str) -> bool {
        self.allowed_modules.iter().any(|m| m == module)
    }

    pub fn allows_activation(&self) -> bool {
        self.max_instances > 0
    }
}
