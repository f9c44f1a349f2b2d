//! Per-dispatch audit log entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lifecycle::LifecycleAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionLogStatus {
    InProgress,
    Success,
    Failed,
}

impl ActionLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionLogStatus::InProgress => "IN_PROGRESS",
            ActionLogStatus::Success => "SUCCESS",
            ActionLogStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "IN_PROGRESS" => Some(ActionLogStatus::InProgress),
            "SUCCESS" => Some(ActionLogStatus::Success),
            "FAILED" => Some(ActionLogStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub user_id: Uuid,
    pub action: LifecycleAction,
    pub status: ActionLogStatus,
    pub error_message: Option<String>,
    pub duration_seconds: Option<i64>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ActionLog {
    pub fn started(
        instance_id: Uuid,
        user_id: Uuid,
        action: LifecycleAction,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instance_id,
            user_id,
            action,
            status: ActionLogStatus::InProgress,
            error_message: None,
            duration_seconds: None,
            details,
            created_at: Utc::now(),
        }
    }
}
