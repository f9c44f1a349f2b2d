//! Plan catalog entry
//!
//! Referenced, never mutated, by the orchestration core; managed through the
//! staff-only catalog endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Plan {
    pub id: Uuid,

    #[validate(length(min = 2, max = 50, message = "Plan name must be between 2 and 50 characters"))]
    pub name: String,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,

    #[validate(range(min = 1, max = 10000, message = "Max users must be between 1 and 10000"))]
    pub max_users: i32,

    #[validate(range(min = 1, message = "Storage limit must be at least 1 GB"))]
    pub storage_limit_gb: i32,

    #[validate(range(min = 0, message = "Max instances cannot be negative"))]
    pub max_instances: i32,

    /// Technical names of the modules instances under this plan may enable.
    pub allowed_modules: Vec<String>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(
        name: String,
        price: f64,
        max_users: i32,
        storage_limit_gb: i32,
        max_instances: i32,
        allowed_modules: Vec<String>,
    ) -> Result<Self, validator::ValidationErrors> {
        let plan = Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            price,
            max_users,
            storage_limit_gb,
            max_instances,
            allowed_modules,
            is_active: true,
            created_at: Utc::now(),
        };

        plan.validate()?;
        Ok(plan)
    }
}
