//! Action log repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{ActionLog, ActionLogStatus};
use crate::error::DomainError;

#[async_trait]
pub trait ActionLogRepository: Send + Sync {
    async fn create(&self, log: &ActionLog) -> Result<ActionLog, DomainError>;

    /// Record the outcome of an in-progress entry.
    async fn finish(
        &self,
        id: &Uuid,
        status: ActionLogStatus,
        error_message: Option<String>,
        duration_seconds: i64,
    ) -> Result<(), DomainError>;

    async fn list_by_instance(&self, instance_id: &Uuid) -> Result<Vec<ActionLog>, DomainError>;
}
